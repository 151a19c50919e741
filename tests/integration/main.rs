mod embedding_client_tests;
mod search_service_tests;
