/*!
 * Scenarios
 * Ready-made runs of the race and the harness with simulated sources
 */

pub mod database;
pub mod grocery;

pub use database::{db_call, db_harness, db_items, DB_DATA};
pub use grocery::{
    announce, grocery_race, grocery_race_with, price_group, random_price, Alert, MAX_BEEF_PRICE,
    MAX_CHICKEN_PRICE, PRICE_CEILING, WEBSITES,
};
