/// A request to create a flow from a spec.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateFlowRequest {
    /// The spec of the flow to create.
    #[prost(message, optional, tag = "1")]
    pub spec: ::core::option::Option<::flowpipe_core::models::proto::FlowSpec>,
}
/// A request to append a new version to a flow.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateFlowRequest {
    /// The name of the flow to update.
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    /// The new spec of the flow.
    #[prost(message, optional, tag = "2")]
    pub spec: ::core::option::Option<::flowpipe_core::models::proto::FlowSpec>,
}
/// A request to fetch a flow at its active version.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetFlowRequest {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
}
/// A request to list all flows.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListFlowsRequest {}
/// The listing of all flows at their active versions.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListFlowsResponse {
    #[prost(message, repeated, tag = "1")]
    pub flows: ::prost::alloc::vec::Vec<::flowpipe_core::models::proto::Flow>,
}
/// A request to delete a flow and all of its versions.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteFlowRequest {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
}
/// The response to a flow deletion.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteFlowResponse {}
/// A request to fetch the controller-owned status of a flow.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetFlowStatusRequest {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
}
/// A request to point a flow's active pointer at an existing version.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RollbackFlowRequest {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(uint64, tag = "2")]
    pub version: u64,
}
/// A registered schema artifact.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Schema {
    /// The registry identifier of this schema.
    #[prost(string, tag = "1")]
    pub registry_id: ::prost::alloc::string::String,
    /// The version of this schema, stamped by the registry.
    #[prost(uint32, tag = "2")]
    pub version: u32,
    #[prost(
        enumeration = "::flowpipe_core::models::proto::QueueSchemaFormat",
        tag = "3"
    )]
    pub format: i32,
    /// The opaque schema payload.
    #[prost(bytes = "vec", tag = "4")]
    pub raw_schema: ::prost::alloc::vec::Vec<u8>,
}
/// A request to register a new schema version.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateSchemaRequest {
    #[prost(string, tag = "1")]
    pub registry_id: ::prost::alloc::string::String,
    #[prost(
        enumeration = "::flowpipe_core::models::proto::QueueSchemaFormat",
        tag = "2"
    )]
    pub format: i32,
    #[prost(bytes = "vec", tag = "3")]
    pub raw_schema: ::prost::alloc::vec::Vec<u8>,
}
/// A request to fetch a schema; version 0 resolves the active version.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetSchemaRequest {
    #[prost(string, tag = "1")]
    pub registry_id: ::prost::alloc::string::String,
    #[prost(uint32, tag = "2")]
    pub version: u32,
}
/// A request to list every version of a schema.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListSchemaVersionsRequest {
    #[prost(string, tag = "1")]
    pub registry_id: ::prost::alloc::string::String,
}
/// The listing of a schema's versions, ascending.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListSchemaVersionsResponse {
    #[prost(message, repeated, tag = "1")]
    pub schemas: ::prost::alloc::vec::Vec<Schema>,
}
/// A request to delete a schema and all of its versions.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteSchemaRequest {
    #[prost(string, tag = "1")]
    pub registry_id: ::prost::alloc::string::String,
}
/// The response to a schema deletion.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteSchemaResponse {}
#[doc = r" Generated server implementations."]
pub mod flow_service_server {
    #![allow(unused_variables, dead_code, missing_docs, clippy::let_unit_value)]
    use tonic::codegen::*;
    #[doc = "Generated trait containing gRPC methods that should be implemented for use with FlowServiceServer."]
    #[async_trait]
    pub trait FlowService: Send + Sync + 'static {
        #[doc = " Create a flow; its first version is 1."]
        async fn create_flow(
            &self,
            request: tonic::Request<super::CreateFlowRequest>,
        ) -> Result<tonic::Response<::flowpipe_core::models::proto::Flow>, tonic::Status>;
        #[doc = " Append a new version to a flow and swap its active pointer."]
        async fn update_flow(
            &self,
            request: tonic::Request<super::UpdateFlowRequest>,
        ) -> Result<tonic::Response<::flowpipe_core::models::proto::Flow>, tonic::Status>;
        #[doc = " Fetch a flow at its active version."]
        async fn get_flow(
            &self,
            request: tonic::Request<super::GetFlowRequest>,
        ) -> Result<tonic::Response<::flowpipe_core::models::proto::Flow>, tonic::Status>;
        #[doc = " List all flows at their active versions."]
        async fn list_flows(
            &self,
            request: tonic::Request<super::ListFlowsRequest>,
        ) -> Result<tonic::Response<super::ListFlowsResponse>, tonic::Status>;
        #[doc = " Delete a flow and its entire version history."]
        async fn delete_flow(
            &self,
            request: tonic::Request<super::DeleteFlowRequest>,
        ) -> Result<tonic::Response<super::DeleteFlowResponse>, tonic::Status>;
        #[doc = " Fetch the controller-owned status of a flow."]
        async fn get_flow_status(
            &self,
            request: tonic::Request<super::GetFlowStatusRequest>,
        ) -> Result<tonic::Response<::flowpipe_core::models::proto::FlowStatus>, tonic::Status>;
        #[doc = " Point a flow's active pointer at an existing version."]
        async fn rollback_flow(
            &self,
            request: tonic::Request<super::RollbackFlowRequest>,
        ) -> Result<tonic::Response<::flowpipe_core::models::proto::Flow>, tonic::Status>;
    }
    #[doc = " The flow desired-state service."]
    #[derive(Debug)]
    pub struct FlowServiceServer<T: FlowService> {
        inner: _Inner<T>,
        accept_compression_encodings: (),
        send_compression_encodings: (),
    }
    struct _Inner<T>(Arc<T>);
    impl<T: FlowService> FlowServiceServer<T> {
        pub fn new(inner: T) -> Self {
            let inner = Arc::new(inner);
            let inner = _Inner(inner);
            Self {
                inner,
                accept_compression_encodings: Default::default(),
                send_compression_encodings: Default::default(),
            }
        }
        pub fn with_interceptor<F>(inner: T, interceptor: F) -> InterceptedService<Self, F>
        where
            F: tonic::service::Interceptor,
        {
            InterceptedService::new(Self::new(inner), interceptor)
        }
    }
    impl<T, B> tonic::codegen::Service<http::Request<B>> for FlowServiceServer<T>
    where
        T: FlowService,
        B: Body + Send + Sync + 'static,
        B::Error: Into<StdError> + Send + 'static,
    {
        type Response = http::Response<tonic::body::BoxBody>;
        type Error = Never;
        type Future = BoxFuture<Self::Response, Self::Error>;
        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }
        fn call(&mut self, req: http::Request<B>) -> Self::Future {
            let inner = self.inner.clone();
            match req.uri().path() {
                "/flowpipe.v1.FlowService/CreateFlow" => {
                    #[allow(non_camel_case_types)]
                    struct CreateFlowSvc<T: FlowService>(pub Arc<T>);
                    impl<T: FlowService> tonic::server::UnaryService<super::CreateFlowRequest> for CreateFlowSvc<T> {
                        type Response = ::flowpipe_core::models::proto::Flow;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(&mut self, request: tonic::Request<super::CreateFlowRequest>) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).create_flow(request).await };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = CreateFlowSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(accept_compression_encodings, send_compression_encodings);
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/flowpipe.v1.FlowService/UpdateFlow" => {
                    #[allow(non_camel_case_types)]
                    struct UpdateFlowSvc<T: FlowService>(pub Arc<T>);
                    impl<T: FlowService> tonic::server::UnaryService<super::UpdateFlowRequest> for UpdateFlowSvc<T> {
                        type Response = ::flowpipe_core::models::proto::Flow;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(&mut self, request: tonic::Request<super::UpdateFlowRequest>) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).update_flow(request).await };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = UpdateFlowSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(accept_compression_encodings, send_compression_encodings);
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/flowpipe.v1.FlowService/GetFlow" => {
                    #[allow(non_camel_case_types)]
                    struct GetFlowSvc<T: FlowService>(pub Arc<T>);
                    impl<T: FlowService> tonic::server::UnaryService<super::GetFlowRequest> for GetFlowSvc<T> {
                        type Response = ::flowpipe_core::models::proto::Flow;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(&mut self, request: tonic::Request<super::GetFlowRequest>) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).get_flow(request).await };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = GetFlowSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(accept_compression_encodings, send_compression_encodings);
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/flowpipe.v1.FlowService/ListFlows" => {
                    #[allow(non_camel_case_types)]
                    struct ListFlowsSvc<T: FlowService>(pub Arc<T>);
                    impl<T: FlowService> tonic::server::UnaryService<super::ListFlowsRequest> for ListFlowsSvc<T> {
                        type Response = super::ListFlowsResponse;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(&mut self, request: tonic::Request<super::ListFlowsRequest>) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).list_flows(request).await };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = ListFlowsSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(accept_compression_encodings, send_compression_encodings);
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/flowpipe.v1.FlowService/DeleteFlow" => {
                    #[allow(non_camel_case_types)]
                    struct DeleteFlowSvc<T: FlowService>(pub Arc<T>);
                    impl<T: FlowService> tonic::server::UnaryService<super::DeleteFlowRequest> for DeleteFlowSvc<T> {
                        type Response = super::DeleteFlowResponse;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(&mut self, request: tonic::Request<super::DeleteFlowRequest>) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).delete_flow(request).await };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = DeleteFlowSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(accept_compression_encodings, send_compression_encodings);
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/flowpipe.v1.FlowService/GetFlowStatus" => {
                    #[allow(non_camel_case_types)]
                    struct GetFlowStatusSvc<T: FlowService>(pub Arc<T>);
                    impl<T: FlowService> tonic::server::UnaryService<super::GetFlowStatusRequest> for GetFlowStatusSvc<T> {
                        type Response = ::flowpipe_core::models::proto::FlowStatus;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(&mut self, request: tonic::Request<super::GetFlowStatusRequest>) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).get_flow_status(request).await };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = GetFlowStatusSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(accept_compression_encodings, send_compression_encodings);
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/flowpipe.v1.FlowService/RollbackFlow" => {
                    #[allow(non_camel_case_types)]
                    struct RollbackFlowSvc<T: FlowService>(pub Arc<T>);
                    impl<T: FlowService> tonic::server::UnaryService<super::RollbackFlowRequest> for RollbackFlowSvc<T> {
                        type Response = ::flowpipe_core::models::proto::Flow;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(&mut self, request: tonic::Request<super::RollbackFlowRequest>) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).rollback_flow(request).await };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = RollbackFlowSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(accept_compression_encodings, send_compression_encodings);
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                _ => Box::pin(async move {
                    Ok(http::Response::builder()
                        .status(200)
                        .header("grpc-status", "12")
                        .header("content-type", "application/grpc")
                        .body(empty_body())
                        .unwrap())
                }),
            }
        }
    }
    impl<T: FlowService> Clone for FlowServiceServer<T> {
        fn clone(&self) -> Self {
            let inner = self.inner.clone();
            Self {
                inner,
                accept_compression_encodings: self.accept_compression_encodings,
                send_compression_encodings: self.send_compression_encodings,
            }
        }
    }
    impl<T: FlowService> Clone for _Inner<T> {
        fn clone(&self) -> Self {
            Self(self.0.clone())
        }
    }
    impl<T: std::fmt::Debug> std::fmt::Debug for _Inner<T> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self.0)
        }
    }
    impl<T: FlowService> tonic::transport::NamedService for FlowServiceServer<T> {
        const NAME: &'static str = "flowpipe.v1.FlowService";
    }
}
#[doc = r" Generated server implementations."]
pub mod schema_registry_service_server {
    #![allow(unused_variables, dead_code, missing_docs, clippy::let_unit_value)]
    use tonic::codegen::*;
    #[doc = "Generated trait containing gRPC methods that should be implemented for use with SchemaRegistryServiceServer."]
    #[async_trait]
    pub trait SchemaRegistryService: Send + Sync + 'static {
        #[doc = " Register a new schema version; the first version is 1."]
        async fn create_schema(
            &self,
            request: tonic::Request<super::CreateSchemaRequest>,
        ) -> Result<tonic::Response<super::Schema>, tonic::Status>;
        #[doc = " Fetch a schema; version 0 resolves the active version."]
        async fn get_schema(
            &self,
            request: tonic::Request<super::GetSchemaRequest>,
        ) -> Result<tonic::Response<super::Schema>, tonic::Status>;
        #[doc = " List every version of a schema, ascending."]
        async fn list_schema_versions(
            &self,
            request: tonic::Request<super::ListSchemaVersionsRequest>,
        ) -> Result<tonic::Response<super::ListSchemaVersionsResponse>, tonic::Status>;
        #[doc = " Delete a schema and its entire version history."]
        async fn delete_schema(
            &self,
            request: tonic::Request<super::DeleteSchemaRequest>,
        ) -> Result<tonic::Response<super::DeleteSchemaResponse>, tonic::Status>;
    }
    #[doc = " The schema registry service."]
    #[derive(Debug)]
    pub struct SchemaRegistryServiceServer<T: SchemaRegistryService> {
        inner: _Inner<T>,
        accept_compression_encodings: (),
        send_compression_encodings: (),
    }
    struct _Inner<T>(Arc<T>);
    impl<T: SchemaRegistryService> SchemaRegistryServiceServer<T> {
        pub fn new(inner: T) -> Self {
            let inner = Arc::new(inner);
            let inner = _Inner(inner);
            Self {
                inner,
                accept_compression_encodings: Default::default(),
                send_compression_encodings: Default::default(),
            }
        }
        pub fn with_interceptor<F>(inner: T, interceptor: F) -> InterceptedService<Self, F>
        where
            F: tonic::service::Interceptor,
        {
            InterceptedService::new(Self::new(inner), interceptor)
        }
    }
    impl<T, B> tonic::codegen::Service<http::Request<B>> for SchemaRegistryServiceServer<T>
    where
        T: SchemaRegistryService,
        B: Body + Send + Sync + 'static,
        B::Error: Into<StdError> + Send + 'static,
    {
        type Response = http::Response<tonic::body::BoxBody>;
        type Error = Never;
        type Future = BoxFuture<Self::Response, Self::Error>;
        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }
        fn call(&mut self, req: http::Request<B>) -> Self::Future {
            let inner = self.inner.clone();
            match req.uri().path() {
                "/flowpipe.v1.SchemaRegistryService/CreateSchema" => {
                    #[allow(non_camel_case_types)]
                    struct CreateSchemaSvc<T: SchemaRegistryService>(pub Arc<T>);
                    impl<T: SchemaRegistryService> tonic::server::UnaryService<super::CreateSchemaRequest> for CreateSchemaSvc<T> {
                        type Response = super::Schema;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(&mut self, request: tonic::Request<super::CreateSchemaRequest>) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).create_schema(request).await };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = CreateSchemaSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(accept_compression_encodings, send_compression_encodings);
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/flowpipe.v1.SchemaRegistryService/GetSchema" => {
                    #[allow(non_camel_case_types)]
                    struct GetSchemaSvc<T: SchemaRegistryService>(pub Arc<T>);
                    impl<T: SchemaRegistryService> tonic::server::UnaryService<super::GetSchemaRequest> for GetSchemaSvc<T> {
                        type Response = super::Schema;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(&mut self, request: tonic::Request<super::GetSchemaRequest>) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).get_schema(request).await };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = GetSchemaSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(accept_compression_encodings, send_compression_encodings);
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/flowpipe.v1.SchemaRegistryService/ListSchemaVersions" => {
                    #[allow(non_camel_case_types)]
                    struct ListSchemaVersionsSvc<T: SchemaRegistryService>(pub Arc<T>);
                    impl<T: SchemaRegistryService> tonic::server::UnaryService<super::ListSchemaVersionsRequest> for ListSchemaVersionsSvc<T> {
                        type Response = super::ListSchemaVersionsResponse;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(&mut self, request: tonic::Request<super::ListSchemaVersionsRequest>) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).list_schema_versions(request).await };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = ListSchemaVersionsSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(accept_compression_encodings, send_compression_encodings);
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/flowpipe.v1.SchemaRegistryService/DeleteSchema" => {
                    #[allow(non_camel_case_types)]
                    struct DeleteSchemaSvc<T: SchemaRegistryService>(pub Arc<T>);
                    impl<T: SchemaRegistryService> tonic::server::UnaryService<super::DeleteSchemaRequest> for DeleteSchemaSvc<T> {
                        type Response = super::DeleteSchemaResponse;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(&mut self, request: tonic::Request<super::DeleteSchemaRequest>) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).delete_schema(request).await };
                            Box::pin(fut)
                        }
                    }
                    let accept_compression_encodings = self.accept_compression_encodings;
                    let send_compression_encodings = self.send_compression_encodings;
                    let inner = self.inner.clone();
                    let fut = async move {
                        let inner = inner.0;
                        let method = DeleteSchemaSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec)
                            .apply_compression_config(accept_compression_encodings, send_compression_encodings);
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                _ => Box::pin(async move {
                    Ok(http::Response::builder()
                        .status(200)
                        .header("grpc-status", "12")
                        .header("content-type", "application/grpc")
                        .body(empty_body())
                        .unwrap())
                }),
            }
        }
    }
    impl<T: SchemaRegistryService> Clone for SchemaRegistryServiceServer<T> {
        fn clone(&self) -> Self {
            let inner = self.inner.clone();
            Self {
                inner,
                accept_compression_encodings: self.accept_compression_encodings,
                send_compression_encodings: self.send_compression_encodings,
            }
        }
    }
    impl<T: SchemaRegistryService> Clone for _Inner<T> {
        fn clone(&self) -> Self {
            Self(self.0.clone())
        }
    }
    impl<T: std::fmt::Debug> std::fmt::Debug for _Inner<T> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self.0)
        }
    }
    impl<T: SchemaRegistryService> tonic::transport::NamedService for SchemaRegistryServiceServer<T> {
        const NAME: &'static str = "flowpipe.v1.SchemaRegistryService";
    }
}
