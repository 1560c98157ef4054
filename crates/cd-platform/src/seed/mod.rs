//! Seed Data

pub mod dev_seeder;

pub use dev_seeder::DevDataSeeder;
