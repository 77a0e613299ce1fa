use anyhow::{anyhow, Context as _, Result};
use notehub_types::oidc::OIDCProviderConfig;
use openidconnect::{
    core::{CoreAuthenticationFlow, CoreClient, CoreProviderMetadata},
    AccessTokenHash, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointMaybeSet,
    EndpointNotSet, EndpointSet, IssuerUrl, Nonce, OAuth2TokenResponse, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, Scope, TokenResponse,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

const SCOPES: &[&str] = &["email", "profile"];

type ConfiguredClient = CoreClient<
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointMaybeSet,
    EndpointMaybeSet,
>;

/// Identity established by the provider, enough to find or provision
/// a local account.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct OIDCClient {
    client: ConfiguredClient,
    http_client: reqwest::Client,
}

impl OIDCClient {
    pub async fn discover(
        provider: &OIDCProviderConfig,
        redirect_url: impl Into<String>,
    ) -> Result<Self> {
        let http_client = reqwest::ClientBuilder::new()
            // Following redirects opens the client up to SSRF vulnerabilities.
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        let provider_metadata = CoreProviderMetadata::discover_async(
            IssuerUrl::new(provider.issuer_url.clone())?,
            &http_client,
        )
        .await?;

        let client = CoreClient::from_provider_metadata(
            provider_metadata,
            ClientId::new(provider.client_id.clone()),
            provider
                .client_secret
                .as_ref()
                .map(|s| ClientSecret::new(s.to_string())),
        )
        .set_redirect_uri(RedirectUrl::new(redirect_url.into())?);

        debug!("Discovered OIDC provider: {:?}", client);

        Ok(Self {
            client,
            http_client,
        })
    }

    /// Builds the authorization URL to redirect the browser to. The
    /// returned secrets must survive in the session until the callback.
    pub fn auth_url(&self) -> (Url, OIDCSecrets) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let mut url_builder = self
            .client
            .authorize_url(
                CoreAuthenticationFlow::AuthorizationCode,
                CsrfToken::new_random,
                Nonce::new_random,
            )
            .set_pkce_challenge(pkce_challenge);

        for scope in SCOPES {
            url_builder = url_builder.add_scope(Scope::new(scope.to_string()));
        }
        let (url, csrf_token, nonce) = url_builder.url();
        debug!("Generated auth URL: {}", url);
        (
            url,
            OIDCSecrets {
                csrf_token,
                nonce,
                pkce_verifier,
            },
        )
    }

    /// Exchanges the callback code for tokens and verifies state, nonce
    /// and access token hash before trusting the claims.
    pub async fn token(
        &self,
        code: String,
        state: &str,
        secrets: OIDCSecrets,
    ) -> Result<AuthenticatedUser> {
        if state != secrets.csrf_token.secret() {
            return Err(anyhow!("CSRF state mismatch"));
        }

        let token_response = self
            .client
            .exchange_code(AuthorizationCode::new(code))?
            .set_pkce_verifier(secrets.pkce_verifier)
            .request_async(&self.http_client)
            .await?;

        let id_token = token_response
            .id_token()
            .ok_or_else(|| anyhow!("Server did not return an ID token"))?;
        let id_token_verifier = self.client.id_token_verifier();
        let claims = id_token.claims(&id_token_verifier, &secrets.nonce)?;

        // Verify the access token hash to ensure that the access token hasn't
        // been substituted for another user's.
        if let Some(expected_access_token_hash) = claims.access_token_hash() {
            let actual_access_token_hash = AccessTokenHash::from_token(
                token_response.access_token(),
                id_token.signing_alg()?,
                id_token.signing_key(&id_token_verifier)?,
            )?;
            if actual_access_token_hash != *expected_access_token_hash {
                return Err(anyhow!("Invalid access token"));
            }
        } else {
            return Err(anyhow!("Access token hash is missing"));
        }

        let email = claims
            .email()
            .map(|e| e.to_string())
            .context("Provider did not supply an email claim")?;
        let name = claims
            .name()
            .and_then(|n| n.get(None))
            .map(|n| n.to_string())
            .or_else(|| claims.preferred_username().map(|n| n.to_string()))
            .unwrap_or_else(|| email.split('@').next().unwrap_or(&email).to_string());

        Ok(AuthenticatedUser { email, name })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OIDCSecrets {
    csrf_token: CsrfToken,
    nonce: Nonce,
    pkce_verifier: PkceCodeVerifier,
}
