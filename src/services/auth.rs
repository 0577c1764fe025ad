use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{repository_error, Reply, RequestHandler, Service, ServiceError};
use crate::mailer::OtpMailer;
use crate::models::users::{NewUser, Role, SignUp, TempUser, User, UserProfile};
use crate::repositories::temp_users::TempUserRepository;
use crate::repositories::users::UserRepository;
use crate::settings::Settings;

const OTP_DIGITS: u32 = 4;
const REFERRAL_CODE_LENGTH: usize = 8;
const REFERRAL_CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const REFERRAL_CODE_ATTEMPTS: usize = 5;
/// Wrong codes tolerated before a pending signup is discarded.
pub const MAX_OTP_ATTEMPTS: i32 = 5;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 keys for the session cookie.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl_days: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::days(ttl_days),
        }
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl.num_seconds()
    }

    pub fn issue(&self, user: &User) -> Result<String, ServiceError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ServiceError::Internal(format!("could not sign token: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| ServiceError::Unauthorized("Invalid or expired session".to_string()))
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedIn {
    pub user: User,
    pub redirect_to: String,
    #[serde(skip)]
    pub token: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpIssued {
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

pub enum AuthRequest {
    SignIn {
        email: String,
        password: String,
        response: Reply<SignedIn>,
    },
    SignOut {
        token: Option<String>,
        response: Reply<()>,
    },
    SignUp {
        sign_up: SignUp,
        response: Reply<TempUser>,
    },
    SendOtp {
        email: String,
        response: Reply<OtpIssued>,
    },
    VerifyOtp {
        email: String,
        otp: String,
        response: Reply<UserProfile>,
    },
}

pub fn generate_otp() -> String {
    let code = rand::thread_rng().gen_range(0..10u32.pow(OTP_DIGITS));
    format!("{:0width$}", code, width = OTP_DIGITS as usize)
}

pub fn generate_referral_code() -> String {
    let mut rng = rand::thread_rng();
    (0..REFERRAL_CODE_LENGTH)
        .map(|_| REFERRAL_CODE_CHARSET[rng.gen_range(0..REFERRAL_CODE_CHARSET.len())] as char)
        .collect()
}

/// Issues a new code when the current one has expired. Returns whether it did.
pub fn renew_otp(temp_user: &mut TempUser, now: DateTime<Utc>, ttl: Duration) -> bool {
    if !temp_user.is_expired(now) {
        return false;
    }

    temp_user.otp = generate_otp();
    temp_user.failed_attempts = 0;
    temp_user.expires_at = now + ttl;
    true
}

async fn hash_password(password: String, cost: u32) -> Result<String, ServiceError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ServiceError::Internal(e.to_string()))?
        .map_err(|e| ServiceError::Internal(format!("could not hash password: {}", e)))
}

async fn verify_password(password: String, hash: String) -> Result<bool, ServiceError> {
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| ServiceError::Internal(e.to_string()))?;

    // A malformed stored hash can never match.
    Ok(verified.unwrap_or(false))
}

#[derive(Clone)]
pub struct AuthRequestHandler {
    users: Arc<dyn UserRepository>,
    temp_users: Arc<dyn TempUserRepository>,
    mailer: Arc<dyn OtpMailer>,
    keys: Arc<TokenKeys>,
    otp_ttl: Duration,
    bcrypt_cost: u32,
    signup_bonus: rust_decimal::Decimal,
    currency: String,
}

impl AuthRequestHandler {
    pub fn new(
        users: Arc<dyn UserRepository>,
        temp_users: Arc<dyn TempUserRepository>,
        mailer: Arc<dyn OtpMailer>,
        keys: Arc<TokenKeys>,
        settings: &Settings,
    ) -> Self {
        AuthRequestHandler {
            users,
            temp_users,
            mailer,
            keys,
            otp_ttl: Duration::minutes(settings.otp.ttl_minutes),
            bcrypt_cost: settings.auth.bcrypt_cost,
            signup_bonus: settings.wallet.signup_bonus,
            currency: settings.wallet.currency.clone(),
        }
    }

    async fn sign_in(&self, email: &str, password: String) -> Result<SignedIn, ServiceError> {
        let mut user = self
            .users
            .get_user_by_email(email)
            .await
            .map_err(repository_error("get user"))?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        if !verify_password(password, user.password_hash.clone()).await? {
            log::warn!("Rejected sign-in for {}", email);
            return Err(ServiceError::Unauthorized("Invalid credentials".to_string()));
        }
        if !user.is_active {
            return Err(ServiceError::Forbidden("Account is disabled".to_string()));
        }

        let token = self.keys.issue(&user)?;
        self.users
            .set_online(email, true)
            .await
            .map_err(repository_error("set online"))?;
        user.is_online = true;

        log::info!("User {} signed in", user.id);
        Ok(SignedIn {
            redirect_to: user.role.redirect_path().to_string(),
            user,
            token,
        })
    }

    async fn sign_out(&self, token: Option<String>) -> Result<(), ServiceError> {
        let Some(claims) = token.and_then(|t| self.keys.verify(&t).ok()) else {
            return Ok(());
        };

        self.users
            .set_online(&claims.email, false)
            .await
            .map_err(repository_error("set offline"))
    }

    async fn sign_up(&self, sign_up: SignUp) -> Result<TempUser, ServiceError> {
        let existing = self
            .users
            .get_user_by_email(&sign_up.email)
            .await
            .map_err(repository_error("get user"))?;
        if existing.is_some() {
            return Err(ServiceError::Conflict("User already exists".to_string()));
        }

        if let Some(code) = &sign_up.referral {
            let referrer = self
                .users
                .get_user_by_referral_code(code)
                .await
                .map_err(repository_error("get referrer"))?;
            if referrer.is_none() {
                return Err(ServiceError::InvalidInput("Invalid referral code".to_string()));
            }
        }

        let password_hash = hash_password(sign_up.password, self.bcrypt_cost).await?;
        let now = Utc::now();
        let temp_user = TempUser {
            email: sign_up.email,
            name: sign_up.name,
            password_hash,
            referral: sign_up.referral,
            otp: generate_otp(),
            failed_attempts: 0,
            expires_at: now + self.otp_ttl,
            created_at: now,
        };

        self.temp_users
            .upsert_temp_user(&temp_user)
            .await
            .map_err(repository_error("store pending signup"))?;
        self.deliver(&temp_user).await?;

        log::info!("Pending signup stored for {}", temp_user.email);
        Ok(temp_user)
    }

    async fn send_otp(&self, email: &str) -> Result<OtpIssued, ServiceError> {
        let mut temp_user = self
            .temp_users
            .get_temp_user(email)
            .await
            .map_err(repository_error("get pending signup"))?
            .ok_or_else(|| ServiceError::NotFound("No pending signup for this email".to_string()))?;

        if renew_otp(&mut temp_user, Utc::now(), self.otp_ttl) {
            self.temp_users
                .upsert_temp_user(&temp_user)
                .await
                .map_err(repository_error("store pending signup"))?;
        }
        self.deliver(&temp_user).await?;

        Ok(OtpIssued {
            email: temp_user.email,
            expires_at: temp_user.expires_at,
        })
    }

    async fn verify_otp(&self, email: &str, otp: &str) -> Result<UserProfile, ServiceError> {
        let temp_user = self
            .temp_users
            .get_temp_user(email)
            .await
            .map_err(repository_error("get pending signup"))?
            .ok_or_else(|| ServiceError::NotFound("No pending signup for this email".to_string()))?;

        if temp_user.is_expired(Utc::now()) {
            return Err(ServiceError::InvalidInput("OTP has expired".to_string()));
        }
        if temp_user.failed_attempts >= MAX_OTP_ATTEMPTS {
            return Err(self.discard_pending(email).await);
        }
        if temp_user.otp != otp {
            log::warn!("Wrong OTP submitted for {}", email);
            let attempts = self
                .temp_users
                .record_failed_attempt(email)
                .await
                .map_err(repository_error("record failed attempt"))?;
            if attempts >= MAX_OTP_ATTEMPTS {
                return Err(self.discard_pending(email).await);
            }
            return Err(ServiceError::InvalidInput("Invalid OTP".to_string()));
        }

        let referred_by = match &temp_user.referral {
            Some(code) => self
                .users
                .get_user_by_referral_code(code)
                .await
                .map_err(repository_error("get referrer"))?
                .map(|referrer| referrer.id),
            None => None,
        };

        let user = self
            .users
            .create_user(NewUser {
                name: temp_user.name,
                email: temp_user.email,
                password_hash: temp_user.password_hash,
                referral_code: self.unused_referral_code().await?,
                referred_by,
                signup_bonus: self.signup_bonus,
                currency: self.currency.clone(),
            })
            .await?;

        self.temp_users
            .delete_temp_user(email)
            .await
            .map_err(repository_error("delete pending signup"))?;

        log::info!("User {} created for {}", user.id, user.email);
        Ok(UserProfile::from(user))
    }

    /// Drops a pending signup that ran out of attempts.
    async fn discard_pending(&self, email: &str) -> ServiceError {
        log::warn!("Too many wrong OTPs for {}, discarding pending signup", email);
        if let Err(e) = self.temp_users.delete_temp_user(email).await {
            return repository_error("delete pending signup")(e);
        }
        ServiceError::InvalidInput("Too many wrong codes, please sign up again".to_string())
    }

    async fn unused_referral_code(&self) -> Result<String, ServiceError> {
        for _ in 0..REFERRAL_CODE_ATTEMPTS {
            let code = generate_referral_code();
            let taken = self
                .users
                .get_user_by_referral_code(&code)
                .await
                .map_err(repository_error("check referral code"))?;
            if taken.is_none() {
                return Ok(code);
            }
        }

        Err(ServiceError::Internal("could not allocate a referral code".to_string()))
    }

    async fn deliver(&self, temp_user: &TempUser) -> Result<(), ServiceError> {
        self.mailer
            .send_otp(&temp_user.email, &temp_user.otp, temp_user.expires_at)
            .await
            .map_err(|e| {
                log::error!("OTP delivery to {} failed: {}", temp_user.email, e);
                ServiceError::Communication("mailer".to_string(), e.to_string())
            })
    }
}

#[async_trait]
impl RequestHandler<AuthRequest> for AuthRequestHandler {
    async fn handle_request(&self, request: AuthRequest) {
        match request {
            AuthRequest::SignIn {
                email,
                password,
                response,
            } => {
                let result = self.sign_in(&email, password).await;
                let _ = response.send(result);
            }
            AuthRequest::SignOut { token, response } => {
                let result = self.sign_out(token).await;
                let _ = response.send(result);
            }
            AuthRequest::SignUp { sign_up, response } => {
                let result = self.sign_up(sign_up).await;
                let _ = response.send(result);
            }
            AuthRequest::SendOtp { email, response } => {
                let result = self.send_otp(&email).await;
                let _ = response.send(result);
            }
            AuthRequest::VerifyOtp {
                email,
                otp,
                response,
            } => {
                let result = self.verify_otp(&email, &otp).await;
                let _ = response.send(result);
            }
        }
    }
}

pub struct AuthService;

impl AuthService {
    pub fn new() -> Self {
        AuthService {}
    }
}

#[async_trait]
impl Service<AuthRequest, AuthRequestHandler> for AuthService {}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(expires_in: Duration) -> TempUser {
        let now = Utc::now();
        TempUser {
            email: "ann@example.com".into(),
            name: "Ann".into(),
            password_hash: String::new(),
            referral: None,
            otp: "1234".into(),
            failed_attempts: 3,
            expires_at: now + expires_in,
            created_at: now,
        }
    }

    #[test]
    fn otp_is_four_digits() {
        for _ in 0..100 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 4);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn live_otp_is_kept() {
        let mut temp_user = pending(Duration::minutes(5));
        let expires_at = temp_user.expires_at;

        assert!(!renew_otp(&mut temp_user, Utc::now(), Duration::minutes(10)));
        assert_eq!(temp_user.otp, "1234");
        assert_eq!(temp_user.expires_at, expires_at);
    }

    #[test]
    fn expired_otp_is_replaced() {
        let mut temp_user = pending(Duration::minutes(-1));
        let now = Utc::now();

        assert!(renew_otp(&mut temp_user, now, Duration::minutes(10)));
        assert_eq!(temp_user.expires_at, now + Duration::minutes(10));
        assert_eq!(temp_user.otp.len(), 4);
        assert_eq!(temp_user.failed_attempts, 0);
    }

    #[test]
    fn tokens_round_trip_and_reject_tampering() {
        let keys = TokenKeys::new("secret", 7);
        let user = User::new("Ann", "ann@example.com", String::new(), Role::Agent, "ABCD2345".into());

        let token = keys.issue(&user).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Role::Agent);
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 3600);

        let other = TokenKeys::new("other", 7);
        assert!(matches!(other.verify(&token), Err(ServiceError::Unauthorized(_))));
    }

    #[test]
    fn referral_codes_use_the_unambiguous_charset() {
        let code = generate_referral_code();
        assert_eq!(code.len(), REFERRAL_CODE_LENGTH);
        assert!(code.bytes().all(|b| REFERRAL_CODE_CHARSET.contains(&b)));
    }
}
