//! Server side of the OAuth2 Authorization Code flow
//!
//! [`AuthFlowController`] drives one provider through `init` and `callback`,
//! delegating each protocol step:
//!
//! - [`AuthorizationUrlBuilder`]: redirect URL to the provider's consent page
//! - [`TokenExchangeClient`]: authorization code for an access token
//! - [`ProfileFetcher`]: user profile and optional email list
//! - [`IdentityMapper`]: provider profile to local identity
//!
//! Providers are plain [`ProviderDescriptor`] values ([`GOOGLE`], [`BITBUCKET`]).

pub mod authorize;
pub mod descriptor;
pub mod flow;
pub mod identity;
pub mod profile;
pub mod settings;
pub mod token;
pub mod transport;

pub use authorize::AuthorizationUrlBuilder;
pub use descriptor::{ProviderDescriptor, BITBUCKET, GOOGLE};
pub use flow::{AuthFlowController, CallbackContext, CallbackOutcome, InitContext};
pub use identity::{IdentityMapper, LoginStrategy, NormalizedIdentity};
pub use profile::{EmailList, ProfileFetcher, RawProfile};
pub use settings::ProviderSettings;
pub use token::TokenExchangeClient;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
