pub mod models;
pub mod pool;
pub mod queries;

#[cfg(test)]
mod tests;
