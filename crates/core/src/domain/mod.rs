pub mod catalog;
pub mod company;
pub mod customer;
pub mod quote;
pub mod record;
