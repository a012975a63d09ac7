pub mod parser_tests;
