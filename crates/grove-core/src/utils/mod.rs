pub mod fs;
pub mod naming;

#[cfg(test)]
mod tests;
