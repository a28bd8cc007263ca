mod lifecycle_tests;
mod storage_tests;
