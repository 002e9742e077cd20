mod crawl_tests;
mod graph_tests;
