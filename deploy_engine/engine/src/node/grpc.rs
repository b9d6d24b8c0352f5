//! gRPC node client over a tonic channel.
//!
//! Messages are declared with prost derives instead of generated from a
//! `.proto`, so the crate builds without `protoc`.

use std::time::Duration;

use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, ClientTlsConfig};
use tonic::{Request, Status};
use tracing::{debug, info};

use crate::config::Endpoint;
use crate::encoding;
use crate::error::DeployError;
use crate::node::{BlockItemStatus, NodeClient, NodeConnector, Outcome, TransactionHash};

const SEND_BLOCK_ITEM: &str = "/node.v1.Queries/SendBlockItem";
const GET_BLOCK_ITEM_STATUS: &str = "/node.v1.Queries/GetBlockItemStatus";
const GET_CRYPTOGRAPHIC_PARAMETERS: &str = "/node.v1.Queries/GetCryptographicParameters";

pub mod messages {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct SendBlockItemRequest {
        #[prost(bytes = "vec", tag = "1")]
        pub raw_block_item: Vec<u8>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct TransactionHash {
        #[prost(bytes = "vec", tag = "1")]
        pub value: Vec<u8>,
    }

    /// `status`: 0 received, 1 committed, 2 finalized.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct BlockItemStatus {
        #[prost(uint32, tag = "1")]
        pub status: u32,
        #[prost(bytes = "vec", tag = "2")]
        pub block_hash: Vec<u8>,
        #[prost(bool, tag = "3")]
        pub success: bool,
        #[prost(string, tag = "4")]
        pub reject_reason: String,
    }

    /// Empty `value` means the last finalized block.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct BlockHashInput {
        #[prost(bytes = "vec", tag = "1")]
        pub value: Vec<u8>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct CryptographicParameters {
        #[prost(string, tag = "1")]
        pub genesis_string: String,
        #[prost(bytes = "vec", tag = "2")]
        pub bulletproof_generators: Vec<u8>,
        #[prost(bytes = "vec", tag = "3")]
        pub on_chain_commitment_key: Vec<u8>,
    }
}

/// Client bound to one channel. `close` drops the channel; later calls fail
/// with `Unavailable`.
pub struct GrpcNodeClient {
    inner: Option<Grpc<Channel>>,
}

impl GrpcNodeClient {
    /// Open a channel. `request_timeout` caps every call made on it.
    pub async fn connect(
        endpoint: &Endpoint,
        connect_timeout: Duration,
        request_timeout: Option<Duration>,
    ) -> Result<Self, DeployError> {
        let scheme = if endpoint.tls { "https" } else { "http" };
        let uri = format!("{scheme}://{}:{}", endpoint.host, endpoint.port);

        let mut transport = Channel::from_shared(uri.clone())
            .map_err(|e| DeployError::ConnectionFailure(format!("bad endpoint {uri}: {e}")))?
            .connect_timeout(connect_timeout);
        if let Some(limit) = request_timeout {
            transport = transport.timeout(limit);
        }
        if endpoint.tls {
            transport = transport
                .tls_config(ClientTlsConfig::new().domain_name(endpoint.host.clone()))?;
        }

        let channel = transport.connect().await?;
        info!(%uri, tls = endpoint.tls, "connected to node");

        Ok(Self::from_channel(channel))
    }

    /// Wrap an existing channel, e.g. one built with `connect_lazy`.
    pub fn from_channel(channel: Channel) -> Self {
        GrpcNodeClient {
            inner: Some(Grpc::new(channel)),
        }
    }

    /// Global cryptographic parameters at `block`, or at the last finalized
    /// block when `None`.
    pub async fn cryptographic_parameters(
        &mut self,
        block: Option<&[u8]>,
    ) -> Result<messages::CryptographicParameters, DeployError> {
        let input = messages::BlockHashInput {
            value: block.map(<[u8]>::to_vec).unwrap_or_default(),
        };
        self.unary(GET_CRYPTOGRAPHIC_PARAMETERS, input)
            .await
            .map_err(|s| DeployError::UnexpectedFault(format!("{:?}: {}", s.code(), s.message())))
    }

    async fn unary<Req, Resp>(&mut self, path: &'static str, message: Req) -> Result<Resp, Status>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let grpc = self
            .inner
            .as_mut()
            .ok_or_else(|| Status::unavailable("channel already closed"))?;
        grpc.ready().await.map_err(not_ready)?;
        let codec = ProstCodec::<Req, Resp>::default();
        let response = grpc
            .unary(Request::new(message), PathAndQuery::from_static(path), codec)
            .await?;
        Ok(response.into_inner())
    }
}

#[tonic::async_trait]
impl NodeClient for GrpcNodeClient {
    async fn send_block_item(&mut self, bytes: Vec<u8>) -> Result<TransactionHash, DeployError> {
        let len = bytes.len();
        let reply: messages::TransactionHash = self
            .unary(SEND_BLOCK_ITEM, messages::SendBlockItemRequest { raw_block_item: bytes })
            .await?;
        debug!(len, hash = %encoding::encode(&reply.value), "node accepted block item");
        Ok(TransactionHash::new(reply.value))
    }

    async fn block_item_status(
        &mut self,
        hash: &TransactionHash,
    ) -> Result<BlockItemStatus, DeployError> {
        let request = messages::TransactionHash {
            value: hash.as_bytes().to_vec(),
        };
        let reply: messages::BlockItemStatus = self
            .unary(GET_BLOCK_ITEM_STATUS, request)
            .await
            .map_err(|s| DeployError::UnexpectedFault(format!("{:?}: {}", s.code(), s.message())))?;

        match reply.status {
            0 => Ok(BlockItemStatus::Received),
            1 => Ok(BlockItemStatus::Committed),
            2 => Ok(BlockItemStatus::Finalized {
                block_hash: encoding::encode(&reply.block_hash),
                outcome: if reply.success {
                    Outcome::Success
                } else {
                    Outcome::Reject {
                        reason: reply.reject_reason,
                    }
                },
            }),
            other => Err(DeployError::UnexpectedFault(format!(
                "unknown block item status {other}"
            ))),
        }
    }

    async fn close(&mut self) -> Result<(), DeployError> {
        // Dropping the last handle stops the channel's background worker.
        if self.inner.take().is_some() {
            debug!("node channel closed");
        }
        Ok(())
    }
}

/// A channel that cannot take requests is a transport problem, not a
/// refusal by the node.
pub(crate) fn not_ready(e: impl std::fmt::Display) -> Status {
    Status::unavailable(format!("node service not ready: {e}"))
}

/// Connector producing [`GrpcNodeClient`]s.
#[derive(Debug, Clone)]
pub struct GrpcConnector {
    pub connect_timeout: Duration,
    pub request_timeout: Option<Duration>,
}

impl GrpcConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        GrpcConnector {
            connect_timeout,
            request_timeout: None,
        }
    }

    pub fn with_request_timeout(mut self, limit: Duration) -> Self {
        self.request_timeout = Some(limit);
        self
    }
}

#[tonic::async_trait]
impl NodeConnector for GrpcConnector {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn NodeClient>, DeployError> {
        let client = GrpcNodeClient::connect(endpoint, self.connect_timeout, self.request_timeout).await?;
        Ok(Box::new(client))
    }
}
