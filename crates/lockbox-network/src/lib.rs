//! Network side of the lockbox controller.
//!
//! Everything that crosses the process boundary lives here:
//!
//! - [`reporter`]: best-effort status pushes to the backend
//! - [`verification`]: the kiosk PIN round trip to the verification authority
//! - [`bus`]: the publish/subscribe command channel
//! - [`proxy`]: pass-through of the kiosk's account calls to the backend
//! - [`server`]: the on-device HTTP router
//! - [`messages`]: the JSON shapes of all of the above
//!
//! The lock itself is never touched from here except through the
//! arbitrator the control loop lends to [`PinVerificationGateway::verify_and_unlock`].

pub mod bus;
pub mod error;
pub mod messages;
pub mod proxy;
pub mod reporter;
pub mod server;
pub mod verification;

pub use bus::{AnyBus, BusTopics, ChannelBus, ChannelBusHandle, MessageBus, TcpBus};
pub use error::NetworkError;
pub use proxy::{BackendProxy, ProxyError, ProxyReply, ProxyResponse, ProxyRoute};
pub use reporter::{StatusReporter, http_client};
pub use server::{
    DirectRequest, KioskRequest, ProxyRequest, RequestQueues, RouterState, build_router,
    request_channels,
};
pub use verification::{
    KioskError, KioskReply, KioskSuccess, PinVerificationGateway, VerificationResult, kiosk_response,
};
