//! OAuth device-flow authorization, credential storage and token refresh.

pub mod device_flow;
pub mod refresher;
pub mod store;
pub mod token;

pub use device_flow::{
    AuthorizationCode, ClientIdentity, DeviceAuthorization, DeviceFlowClient, EndpointSet,
    TokenRefresh,
};
pub use refresher::TokenRefresher;
pub use store::{
    CredentialStore, CredentialStoreConfig, FileCredentialStore, InMemoryCredentialStore,
};
pub use token::AccessCredential;
