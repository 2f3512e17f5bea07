//! The P4Runtime RPC surface the session depends on.
//!
//! [`P4RuntimeService`] is the only way the rest of the crate reaches the
//! device. [`GrpcP4RuntimeService`] implements it with tonic; tests plug in
//! an in-process device instead.

use {
    crate::proto::{
        SetForwardingPipelineConfigRequest, SetForwardingPipelineConfigResponse,
        StreamMessageRequest, StreamMessageResponse, WriteRequest, WriteResponse,
    },
    async_trait::async_trait,
    futures::stream::{BoxStream, StreamExt},
    tokio_stream::wrappers::ReceiverStream,
    tonic::{transport::Channel, Status},
};

/// Inbound half of the stream channel.
pub type InboundStream = BoxStream<'static, Result<StreamMessageResponse, Status>>;

/// Outbound half of the stream channel, fed by the send loop.
pub type OutboundStream = ReceiverStream<StreamMessageRequest>;

#[async_trait]
pub trait P4RuntimeService: Send + Sync + 'static {
    async fn write(&self, request: WriteRequest) -> Result<WriteResponse, Status>;

    async fn set_forwarding_pipeline_config(
        &self,
        request: SetForwardingPipelineConfigRequest,
    ) -> Result<SetForwardingPipelineConfigResponse, Status>;

    /// Open the bidirectional stream. Messages yielded by `outbound` are sent
    /// to the device; the stream is half-closed when `outbound` ends.
    async fn stream_channel(&self, outbound: OutboundStream) -> Result<InboundStream, Status>;
}

/// tonic-backed [`P4RuntimeService`].
#[derive(Debug, Clone)]
pub struct GrpcP4RuntimeService {
    client: p4_runtime_client::P4RuntimeClient<Channel>,
}

impl GrpcP4RuntimeService {
    pub fn new(channel: Channel) -> Self {
        Self {
            client: p4_runtime_client::P4RuntimeClient::new(channel),
        }
    }
}

#[async_trait]
impl P4RuntimeService for GrpcP4RuntimeService {
    async fn write(&self, request: WriteRequest) -> Result<WriteResponse, Status> {
        let mut client = self.client.clone();
        Ok(client.write(request).await?.into_inner())
    }

    async fn set_forwarding_pipeline_config(
        &self,
        request: SetForwardingPipelineConfigRequest,
    ) -> Result<SetForwardingPipelineConfigResponse, Status> {
        let mut client = self.client.clone();
        Ok(client
            .set_forwarding_pipeline_config(request)
            .await?
            .into_inner())
    }

    async fn stream_channel(&self, outbound: OutboundStream) -> Result<InboundStream, Status> {
        let mut client = self.client.clone();
        let inbound = client.stream_channel(outbound).await?.into_inner();
        Ok(inbound.boxed())
    }
}

/// Client for the `p4.v1.P4Runtime` service, covering the RPCs the runner
/// uses.
pub mod p4_runtime_client {
    use {
        crate::proto::{
            SetForwardingPipelineConfigRequest, SetForwardingPipelineConfigResponse,
            StreamMessageRequest, StreamMessageResponse, WriteRequest, WriteResponse,
        },
        tonic::codegen::*,
    };

    const WRITE_PATH: &str = "/p4.v1.P4Runtime/Write";
    const SET_PIPELINE_CONFIG_PATH: &str = "/p4.v1.P4Runtime/SetForwardingPipelineConfig";
    const STREAM_CHANNEL_PATH: &str = "/p4.v1.P4Runtime/StreamChannel";

    #[derive(Debug, Clone)]
    pub struct P4RuntimeClient<T> {
        inner: tonic::client::Grpc<T>,
    }

    impl<T> P4RuntimeClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::BoxBody>,
        T::Error: Into<StdError>,
        T::ResponseBody: Body<Data = Bytes> + Send + 'static,
        <T::ResponseBody as Body>::Error: Into<StdError> + Send,
    {
        pub fn new(inner: T) -> Self {
            Self {
                inner: tonic::client::Grpc::new(inner),
            }
        }

        async fn ready(&mut self) -> Result<(), tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })
        }

        pub async fn write(
            &mut self,
            request: impl tonic::IntoRequest<WriteRequest>,
        ) -> Result<tonic::Response<WriteResponse>, tonic::Status> {
            self.ready().await?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(WRITE_PATH);
            self.inner.unary(request.into_request(), path, codec).await
        }

        pub async fn set_forwarding_pipeline_config(
            &mut self,
            request: impl tonic::IntoRequest<SetForwardingPipelineConfigRequest>,
        ) -> Result<tonic::Response<SetForwardingPipelineConfigResponse>, tonic::Status> {
            self.ready().await?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(SET_PIPELINE_CONFIG_PATH);
            self.inner.unary(request.into_request(), path, codec).await
        }

        pub async fn stream_channel(
            &mut self,
            request: impl tonic::IntoStreamingRequest<Message = StreamMessageRequest>,
        ) -> Result<tonic::Response<tonic::codec::Streaming<StreamMessageResponse>>, tonic::Status>
        {
            self.ready().await?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(STREAM_CHANNEL_PATH);
            self.inner
                .streaming(request.into_streaming_request(), path, codec)
                .await
        }
    }
}
