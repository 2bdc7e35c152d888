//! Request handlers: thin adapters mapping RPC requests onto the stores.

use tonic::{Request, Response, Status};

use flowpipe_core::error::StoreError;
use flowpipe_core::kv::KvBackend;
use flowpipe_core::models::proto::{Flow, FlowStatus};
use flowpipe_core::models::SchemaDefinition;
use flowpipe_core::store::{FlowStore, SchemaRegistry};

use crate::grpc;

/// Flow service handlers over the flow store.
pub struct FlowHandlers<B> {
    store: FlowStore<B>,
}

impl<B> FlowHandlers<B> {
    pub fn new(store: FlowStore<B>) -> Self {
        Self { store }
    }
}

#[tonic::async_trait]
impl<B: KvBackend> grpc::FlowService for FlowHandlers<B> {
    async fn create_flow(
        &self,
        request: Request<grpc::CreateFlowRequest>,
    ) -> Result<Response<Flow>, Status> {
        let spec = request
            .into_inner()
            .spec
            .ok_or_else(|| Status::invalid_argument("flow spec is required"))?;
        let flow = self.store.create_flow(spec).await.map_err(into_status)?;
        Ok(Response::new(flow))
    }

    async fn update_flow(
        &self,
        request: Request<grpc::UpdateFlowRequest>,
    ) -> Result<Response<Flow>, Status> {
        let request = request.into_inner();
        let spec = request
            .spec
            .ok_or_else(|| Status::invalid_argument("flow spec is required"))?;
        let flow = self
            .store
            .update_flow(&request.name, spec)
            .await
            .map_err(into_status)?;
        Ok(Response::new(flow))
    }

    async fn get_flow(
        &self,
        request: Request<grpc::GetFlowRequest>,
    ) -> Result<Response<Flow>, Status> {
        let name = request.into_inner().name;
        let flow = self.store.get_flow(&name).await.map_err(into_status)?;
        Ok(Response::new(flow))
    }

    async fn list_flows(
        &self,
        _request: Request<grpc::ListFlowsRequest>,
    ) -> Result<Response<grpc::ListFlowsResponse>, Status> {
        let flows = self.store.list_flows().await.map_err(into_status)?;
        Ok(Response::new(grpc::ListFlowsResponse { flows }))
    }

    async fn delete_flow(
        &self,
        request: Request<grpc::DeleteFlowRequest>,
    ) -> Result<Response<grpc::DeleteFlowResponse>, Status> {
        let name = request.into_inner().name;
        self.store.delete_flow(&name).await.map_err(into_status)?;
        Ok(Response::new(grpc::DeleteFlowResponse {}))
    }

    async fn get_flow_status(
        &self,
        request: Request<grpc::GetFlowStatusRequest>,
    ) -> Result<Response<FlowStatus>, Status> {
        let name = request.into_inner().name;
        let status = self
            .store
            .get_flow_status(&name)
            .await
            .map_err(into_status)?;
        // An absent status responds as an empty one; status is advisory.
        Ok(Response::new(status.unwrap_or_default()))
    }

    async fn rollback_flow(
        &self,
        request: Request<grpc::RollbackFlowRequest>,
    ) -> Result<Response<Flow>, Status> {
        let request = request.into_inner();
        let flow = self
            .store
            .rollback_flow(&request.name, request.version)
            .await
            .map_err(into_status)?;
        Ok(Response::new(flow))
    }
}

/// Schema registry handlers over the schema store.
pub struct SchemaHandlers<B> {
    registry: SchemaRegistry<B>,
}

impl<B> SchemaHandlers<B> {
    pub fn new(registry: SchemaRegistry<B>) -> Self {
        Self { registry }
    }
}

#[tonic::async_trait]
impl<B: KvBackend> grpc::SchemaRegistryService for SchemaHandlers<B> {
    async fn create_schema(
        &self,
        request: Request<grpc::CreateSchemaRequest>,
    ) -> Result<Response<grpc::Schema>, Status> {
        let request = request.into_inner();
        let schema = SchemaDefinition {
            registry_id: request.registry_id,
            version: 0,
            format: request.format,
            raw_schema: request.raw_schema,
        };
        let created = self
            .registry
            .create_schema(schema)
            .await
            .map_err(into_status)?;
        Ok(Response::new(schema_to_proto(created)))
    }

    async fn get_schema(
        &self,
        request: Request<grpc::GetSchemaRequest>,
    ) -> Result<Response<grpc::Schema>, Status> {
        let request = request.into_inner();
        let schema = self
            .registry
            .get_schema(&request.registry_id, request.version)
            .await
            .map_err(into_status)?;
        Ok(Response::new(schema_to_proto(schema)))
    }

    async fn list_schema_versions(
        &self,
        request: Request<grpc::ListSchemaVersionsRequest>,
    ) -> Result<Response<grpc::ListSchemaVersionsResponse>, Status> {
        let registry_id = request.into_inner().registry_id;
        let schemas = self
            .registry
            .list_schema_versions(&registry_id)
            .await
            .map_err(into_status)?;
        Ok(Response::new(grpc::ListSchemaVersionsResponse {
            schemas: schemas.into_iter().map(schema_to_proto).collect(),
        }))
    }

    async fn delete_schema(
        &self,
        request: Request<grpc::DeleteSchemaRequest>,
    ) -> Result<Response<grpc::DeleteSchemaResponse>, Status> {
        let registry_id = request.into_inner().registry_id;
        self.registry
            .delete_schema(&registry_id)
            .await
            .map_err(into_status)?;
        Ok(Response::new(grpc::DeleteSchemaResponse {}))
    }
}

/// Map a store error onto its user-facing response code.
pub fn into_status(err: StoreError) -> Status {
    let message = err.to_string();
    match err {
        StoreError::Invalid(_) => Status::invalid_argument(message),
        StoreError::NotFound(_) | StoreError::UnknownVersion { .. } => Status::not_found(message),
        StoreError::Conflict(_) => Status::aborted(message),
        StoreError::Backend(_) => Status::unavailable(message),
        StoreError::Cancelled => Status::deadline_exceeded(message),
    }
}

fn schema_to_proto(schema: SchemaDefinition) -> grpc::Schema {
    grpc::Schema {
        registry_id: schema.registry_id,
        version: schema.version,
        format: schema.format,
        raw_schema: schema.raw_schema,
    }
}
