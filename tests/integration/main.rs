mod app_service_tests;
mod battery_node_tests;
mod mock_hw;
