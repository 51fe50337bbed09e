// tests/property/main.rs

mod flows;
