// Test modules for Stockkeep
// Each module covers the corresponding source module

mod session_tests;
