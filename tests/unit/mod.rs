mod fixtures;

mod aggregate_tests;
mod filter_tests;
mod mutation_tests;
