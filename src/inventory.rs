//! Product operations scoped to the owning seller.
//!
//! Ownership is the only access rule: a seller sees and changes only their own
//! products. Update and delete first fetch the product by id and then compare
//! its owner, so a missing product (`NotFound`) and someone else's product
//! (`Forbidden`) stay distinguishable.

use crate::{
    db::{is_unique_violation, Repository},
    errors::AppError,
    structs::Product,
    utils,
};

pub struct InventoryService<'a> {
    repo: &'a Repository,
}

impl<'a> InventoryService<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        InventoryService { repo }
    }

    pub async fn list_owned(&self, seller_id: i64) -> Result<Vec<Product>, AppError> {
        Ok(self.repo.products_by_seller(seller_id).await?)
    }

    /// Restocks the seller's product with the same name and price, or creates
    /// a new one. A different price for the same name is a separate product.
    pub async fn add_or_merge(
        &self,
        seller_id: i64,
        name: &str,
        price: i64,
        quantity: i64,
    ) -> Result<Product, AppError> {
        utils::require_non_blank("Name", name)?;
        check_non_negative(price, quantity)?;

        let product = self
            .repo
            .upsert_product(seller_id, name, price, quantity)
            .await?
            .ok_or_else(|| AppError::validation("Quantity is too large"))?;
        log::info!(
            "Seller {} stocked product {} ({} @ {}), quantity now {}",
            seller_id,
            product.id,
            product.name,
            product.price,
            product.quantity
        );
        Ok(product)
    }

    pub async fn get_owned(&self, seller_id: i64, product_id: i64) -> Result<Product, AppError> {
        let product = self
            .repo
            .find_product(product_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if product.seller_id != seller_id {
            log::warn!(
                "Seller {} denied access to product {} owned by {}",
                seller_id,
                product_id,
                product.seller_id
            );
            return Err(AppError::Forbidden);
        }
        Ok(product)
    }

    /// Replaces price and quantity.
    // the edit handler checks ownership itself and calls `apply_price_quantity`
    #[cfg_attr(not(test), allow(dead_code))]
    pub async fn update_price_quantity(
        &self,
        seller_id: i64,
        product_id: i64,
        price: i64,
        quantity: i64,
    ) -> Result<Product, AppError> {
        let product = self.get_owned(seller_id, product_id).await?;
        self.apply_price_quantity(&product, price, quantity).await
    }

    /// Second half of [`Self::update_price_quantity`], for callers that already
    /// hold the product from [`Self::get_owned`].
    pub async fn apply_price_quantity(
        &self,
        owned: &Product,
        price: i64,
        quantity: i64,
    ) -> Result<Product, AppError> {
        check_non_negative(price, quantity)?;

        let updated = match self
            .repo
            .update_product(owned.id, owned.seller_id, price, quantity)
            .await
        {
            Ok(updated) => updated,
            Err(e) if is_unique_violation(&e) => {
                return Err(AppError::validation(
                    "You already have a product with this name at this price",
                ))
            }
            Err(e) => return Err(e.into()),
        };
        let product = updated.ok_or(AppError::NotFound)?;
        log::info!(
            "Seller {} updated product {}: price={} quantity={}",
            owned.seller_id,
            owned.id,
            price,
            quantity
        );
        Ok(product)
    }

    pub async fn delete(&self, seller_id: i64, product_id: i64) -> Result<(), AppError> {
        self.get_owned(seller_id, product_id).await?;
        if !self.repo.delete_product(product_id, seller_id).await? {
            return Err(AppError::NotFound);
        }
        log::info!("Seller {} deleted product {}", seller_id, product_id);
        Ok(())
    }
}

fn check_non_negative(price: i64, quantity: i64) -> Result<(), AppError> {
    if price < 0 {
        return Err(AppError::validation("Price must not be negative"));
    }
    if quantity < 0 {
        return Err(AppError::validation("Quantity must not be negative"));
    }
    Ok(())
}
