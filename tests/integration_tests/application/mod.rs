mod chat_flow_test;
