//! Conversion of provider profiles into local identities

use serde::Serialize;

use super::descriptor::{LoginField, ProviderDescriptor};
use super::profile::{EmailList, RawProfile};
use crate::{Error, Result};

/// How the local login is derived from the provider login
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStrategy {
    /// `{provider_login}@{provider_key}`
    Unique,
    /// The provider login, verbatim
    ProviderLogin,
}

impl LoginStrategy {
    /// Parse a configured value
    ///
    /// Accepts `Unique`, `ProviderLogin` and the administrator-facing label
    /// `Same as <Provider> login`.
    pub fn parse(value: &str, descriptor: &ProviderDescriptor) -> Result<Self> {
        match value {
            "Unique" => Ok(Self::Unique),
            "ProviderLogin" => Ok(Self::ProviderLogin),
            other if other == descriptor.provider_login_label() => Ok(Self::ProviderLogin),
            other => Err(Error::Configuration(format!(
                "Login strategy not supported : {other}"
            ))),
        }
    }

    #[must_use]
    pub fn label(self, descriptor: &ProviderDescriptor) -> String {
        match self {
            Self::Unique => "Unique".to_string(),
            Self::ProviderLogin => descriptor.provider_login_label(),
        }
    }
}

/// Local identity handed to the host for registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedIdentity {
    pub provider: String,
    /// Stable provider-side user id, when the profile has one
    pub provider_id: Option<String>,
    pub provider_login: String,
    pub login: String,
    pub display_name: String,
    pub email: Option<String>,
}

pub struct IdentityMapper {
    descriptor: &'static ProviderDescriptor,
    strategy: LoginStrategy,
}

impl IdentityMapper {
    #[must_use]
    pub const fn new(descriptor: &'static ProviderDescriptor, strategy: LoginStrategy) -> Self {
        Self {
            descriptor,
            strategy,
        }
    }

    /// Build a mapper from the raw configured strategy; unset means `Unique`
    pub fn from_setting(descriptor: &'static ProviderDescriptor, strategy: Option<&str>) -> Result<Self> {
        let strategy = strategy.map_or(Ok(LoginStrategy::Unique), |value| {
            LoginStrategy::parse(value, descriptor)
        })?;
        Ok(Self::new(descriptor, strategy))
    }

    pub fn map(&self, profile: &RawProfile, emails: Option<&EmailList>) -> Result<NormalizedIdentity> {
        let provider_login = match self.descriptor.login_field {
            LoginField::Email => profile.email.as_deref(),
            LoginField::Username => profile.username.as_deref(),
        }
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Deserialization {
            context: format!("{} user profile has no login", self.descriptor.name),
        })?
        .to_string();

        let login = match self.strategy {
            LoginStrategy::ProviderLogin => provider_login.clone(),
            LoginStrategy::Unique => format!("{provider_login}@{}", self.descriptor.key),
        };

        let display_name = profile
            .display_name()
            .filter(|name| !name.is_empty())
            .unwrap_or(provider_login.as_str())
            .to_string();

        let email = if self.descriptor.emails.is_some() {
            emails.and_then(EmailList::primary_email).map(str::to_string)
        } else {
            profile.email.clone()
        };

        Ok(NormalizedIdentity {
            provider: self.descriptor.key.to_string(),
            provider_id: profile.id(),
            provider_login,
            login,
            display_name,
            email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth2::descriptor::{BITBUCKET, GOOGLE};

    fn bitbucket_user(username: &str, display_name: Option<&str>) -> RawProfile {
        RawProfile {
            username: Some(username.to_string()),
            display_name: display_name.map(str::to_string),
            ..RawProfile::default()
        }
    }

    fn google_user() -> RawProfile {
        serde_json::from_str(
            r#"{
                "id": "42",
                "email": "john.smith@googleoauth.com",
                "verified_email": true,
                "name": "John Smith",
                "given_name": "John",
                "family_name": "Smith",
                "locale": "en-US"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_provider_login_strategy() {
        let mapper = IdentityMapper::new(&BITBUCKET, LoginStrategy::ProviderLogin);
        let identity = mapper.map(&bitbucket_user("john", Some("John")), None).unwrap();

        assert_eq!(identity.login, "john");
        assert_eq!(identity.provider_login, "john");
        assert_eq!(identity.display_name, "John");
        assert!(identity.email.is_none());
    }

    #[test]
    fn test_unique_login_strategy() {
        let mapper = IdentityMapper::new(&BITBUCKET, LoginStrategy::Unique);
        let identity = mapper.map(&bitbucket_user("john", Some("John")), None).unwrap();

        assert_eq!(identity.login, "john@bitbucket");
        assert_eq!(identity.provider, "bitbucket");
    }

    #[test]
    fn test_unsupported_strategy() {
        let err = IdentityMapper::from_setting(&BITBUCKET, Some("xxx")).err().unwrap();
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "Login strategy not supported : xxx");

        let identity = IdentityMapper::from_setting(&GOOGLE, None)
            .unwrap()
            .map(&google_user(), None)
            .unwrap();
        assert_eq!(identity.login, "john.smith@googleoauth.com@google");
    }

    #[test]
    fn test_strategy_labels() {
        assert_eq!(
            LoginStrategy::parse("Same as Bitbucket login", &BITBUCKET).unwrap(),
            LoginStrategy::ProviderLogin
        );
        assert!(LoginStrategy::parse("Same as Google login", &BITBUCKET).is_err());
        assert_eq!(
            LoginStrategy::parse("ProviderLogin", &GOOGLE).unwrap(),
            LoginStrategy::ProviderLogin
        );
    }

    #[test]
    fn test_empty_or_missing_name_falls_back_to_login() {
        let mapper = IdentityMapper::new(&BITBUCKET, LoginStrategy::Unique);

        let identity = mapper.map(&bitbucket_user("john", Some("")), None).unwrap();
        assert_eq!(identity.display_name, "john");

        let identity = mapper.map(&bitbucket_user("john", None), None).unwrap();
        assert_eq!(identity.display_name, "john");
    }

    #[test]
    fn test_primary_email_from_list() {
        let emails: EmailList = serde_json::from_str(
            r#"{"values":[
                {"email":"old@example.com","is_primary":false,"active":true},
                {"email":"john@bitbucket.org","is_primary":true,"active":true}
            ]}"#,
        )
        .unwrap();
        let mapper = IdentityMapper::new(&BITBUCKET, LoginStrategy::Unique);
        let identity = mapper
            .map(&bitbucket_user("john", Some("John")), Some(&emails))
            .unwrap();

        assert_eq!(identity.email.as_deref(), Some("john@bitbucket.org"));
    }

    #[test]
    fn test_google_profile() {
        let mapper = IdentityMapper::new(&GOOGLE, LoginStrategy::ProviderLogin);
        let identity = mapper.map(&google_user(), None).unwrap();

        assert_eq!(identity.login, "john.smith@googleoauth.com");
        assert_eq!(identity.display_name, "John Smith");
        assert_eq!(identity.email.as_deref(), Some("john.smith@googleoauth.com"));
        assert_eq!(identity.provider_id.as_deref(), Some("42"));

        let unique = IdentityMapper::new(&GOOGLE, LoginStrategy::Unique)
            .map(&google_user(), None)
            .unwrap();
        assert_eq!(unique.login, "john.smith@googleoauth.com@google");
    }

    #[test]
    fn test_profile_without_login_is_rejected() {
        let mapper = IdentityMapper::new(&GOOGLE, LoginStrategy::Unique);
        let err = mapper.map(&RawProfile::default(), None).unwrap_err();
        assert!(matches!(err, Error::Deserialization { .. }));
    }
}
