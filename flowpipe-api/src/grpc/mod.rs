mod flowpipe;

pub use flowpipe::flow_service_server::{FlowService, FlowServiceServer};
pub use flowpipe::schema_registry_service_server::{
    SchemaRegistryService, SchemaRegistryServiceServer,
};
pub use flowpipe::*;
