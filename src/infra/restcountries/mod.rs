mod client;

pub use client::RestCountriesClient;
