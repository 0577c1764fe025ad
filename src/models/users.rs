use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{normalize_email, required_email, Page};
use crate::models::multipliers::Multiplier;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Agent => "agent",
            Role::Admin => "admin",
        }
    }

    /// Landing page after sign-in.
    pub fn redirect_path(&self) -> &'static str {
        match self {
            Role::Admin => "/admin",
            Role::Agent => "/agent",
            Role::User => "/",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "agent" => Ok(Role::Agent),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankHold {
    pub amount: Decimal,
    pub request_time: Option<DateTime<Utc>>,
    pub valid_transfer_time: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub main: Decimal,
    pub bonus: Decimal,
    pub referral: Decimal,
    pub bank: BankHold,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkTitle {
    Whatsapp,
    Telegram,
}

impl FromStr for LinkTitle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "whatsapp" => Ok(LinkTitle::Whatsapp),
            "telegram" => Ok(LinkTitle::Telegram),
            _ => Err("title must be whatsapp or telegram".to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentLink {
    pub title: LinkTitle,
    pub link: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPointer {
    pub transaction_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub wallet: Wallet,
    pub total_bets: i64,
    pub total_wins: i64,
    pub total_bet_amount: Decimal,
    pub total_win_amount: Decimal,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub my_refer_list: Vec<String>,
    pub likes: Vec<String>,
    pub like_count: i64,
    pub link: Vec<AgentLink>,
    pub transactions: Vec<TransactionPointer>,
    pub is_online: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        name: &str,
        email: &str,
        password_hash: String,
        role: Role,
        referral_code: String,
    ) -> Self {
        let now = Utc::now();

        User {
            id: uuid::Uuid::new_v4().hyphenated().to_string(),
            name: name.trim().to_string(),
            email: normalize_email(email),
            password_hash,
            role,
            phone: None,
            avatar: None,
            wallet: Wallet::default(),
            total_bets: 0,
            total_wins: 0,
            total_bet_amount: Decimal::ZERO,
            total_win_amount: Decimal::ZERO,
            referral_code,
            referred_by: None,
            my_refer_list: Vec::new(),
            likes: Vec::new(),
            like_count: 0,
            link: Vec::new(),
            transactions: Vec::new(),
            is_online: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn vip_level(&self) -> u8 {
        vip_level(self.total_bet_amount)
    }
}

/// VIP tier derived from the lifetime wagered amount.
pub fn vip_level(total_bet_amount: Decimal) -> u8 {
    const TIERS: [i64; 4] = [1_000, 10_000, 50_000, 100_000];

    TIERS
        .iter()
        .position(|threshold| total_bet_amount < Decimal::from(*threshold))
        .unwrap_or(TIERS.len()) as u8
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    pub vip_level: u8,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        let vip_level = user.vip_level();
        UserProfile { user, vip_level }
    }
}

/// Data needed to create a confirmed account.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub signup_bonus: Decimal,
    pub currency: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TempUser {
    pub email: String,
    pub name: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub referral: Option<String>,
    #[serde(skip_serializing, default)]
    pub otp: String,
    #[serde(skip_serializing, default)]
    pub failed_attempts: i32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl TempUser {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiplierBoard {
    pub single: Option<Decimal>,
    pub double: Option<Decimal>,
    pub triple: Option<Decimal>,
}

impl MultiplierBoard {
    pub fn from_multipliers(multipliers: &[Multiplier]) -> Self {
        use crate::models::multipliers::BetType;

        let value_of = |bet_type: BetType| {
            multipliers
                .iter()
                .find(|m| m.name == bet_type)
                .map(|m| m.value)
        };

        MultiplierBoard {
            single: value_of(BetType::Single),
            double: value_of(BetType::Double),
            triple: value_of(BetType::Triple),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSummary {
    pub wallet_balance: Decimal,
    pub wallet: Wallet,
    pub results: MultiplierBoard,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralEntry {
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralSummary {
    pub referral_code: String,
    pub total: usize,
    pub referrals: Vec<ReferralEntry>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub id: String,
    pub name: String,
    pub email: String,
    pub like_count: i64,
    pub link: Vec<AgentLink>,
}

impl From<User> for AgentCard {
    fn from(user: User) -> Self {
        AgentCard {
            id: user.id,
            name: user.name,
            email: user.email,
            like_count: user.like_count,
            link: user.link,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserCategory {
    All,
    Role(Role),
    Newest,
    Oldest,
    Balance,
}

impl UserCategory {
    pub fn role(&self) -> Option<Role> {
        match self {
            UserCategory::Role(role) => Some(*role),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserCategory::All => "all",
            UserCategory::Role(role) => role.as_str(),
            UserCategory::Newest => "newest",
            UserCategory::Oldest => "oldest",
            UserCategory::Balance => "balance",
        }
    }
}

impl FromStr for UserCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Ok(UserCategory::All),
            "newest" => Ok(UserCategory::Newest),
            "oldest" => Ok(UserCategory::Oldest),
            "balance" => Ok(UserCategory::Balance),
            other => other
                .parse::<Role>()
                .map(UserCategory::Role)
                .map_err(|_| format!("unknown category: {}", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserQuery {
    pub search: String,
    pub category: UserCategory,
    pub page: Page,
}

impl UserQuery {
    /// Stable textual form of the query, used to derive cache keys.
    pub fn canonical(&self) -> String {
        format!(
            "search={}|category={}|page={}|limit={}",
            self.search,
            self.category.as_str(),
            self.page.page,
            self.page.limit
        )
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct UserPage {
    pub success: bool,
    pub data: Vec<User>,
    pub page: u32,
    pub limit: u32,
    pub total: i64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SignInRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl SignInRequest {
    pub fn validate(self) -> Result<(String, String), String> {
        let email = required_email(self.email)?;
        match self.password {
            Some(password) if !password.is_empty() => Ok((email, password)),
            _ => Err("password is required".to_string()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SignUp {
    pub name: String,
    pub email: String,
    pub password: String,
    pub referral: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SignUpRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub referral: Option<String>,
}

pub const MIN_PASSWORD_LENGTH: usize = 6;

impl SignUpRequest {
    pub fn validate(self) -> Result<SignUp, String> {
        let name = self.name.map(|n| n.trim().to_string()).unwrap_or_default();
        if name.is_empty() {
            return Err("name is required".to_string());
        }

        let email = required_email(self.email)?;
        if !looks_like_email(&email) {
            return Err("email is invalid".to_string());
        }

        let password = self.password.unwrap_or_default();
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            ));
        }

        let referral = self
            .referral
            .map(|r| r.trim().to_uppercase())
            .filter(|r| !r.is_empty());

        Ok(SignUp {
            name,
            email,
            password,
            referral,
        })
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: Option<String>,
    pub otp: Option<String>,
}

impl VerifyOtpRequest {
    pub fn validate(self) -> Result<(String, String), String> {
        let email = required_email(self.email)?;
        match self.otp.map(|o| o.trim().to_string()) {
            Some(otp) if !otp.is_empty() => Ok((email, otp)),
            _ => Err("otp is required".to_string()),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct UserQueryRequest {
    pub search: Option<String>,
    pub category: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl UserQueryRequest {
    pub fn validate(self) -> Result<UserQuery, String> {
        let search = self
            .search
            .map(|s| s.trim().to_lowercase())
            .unwrap_or_default();
        let category = self.category.unwrap_or_default().parse::<UserCategory>()?;
        let page = Page::new(self.page, self.limit)?;

        Ok(UserQuery {
            search,
            category,
            page,
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
}

impl UpdateProfileRequest {
    pub fn validate(self) -> Result<(String, ProfileUpdate), String> {
        let email = required_email(self.email)?;
        let trimmed = |value: Option<String>| value.map(|v| v.trim().to_string());

        let update = ProfileUpdate {
            name: trimmed(self.name),
            phone: trimmed(self.phone),
            avatar: trimmed(self.avatar),
        };

        if update.name.as_deref() == Some("") {
            return Err("name cannot be empty".to_string());
        }
        if update == ProfileUpdate::default() {
            return Err("nothing to update".to_string());
        }

        Ok((email, update))
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleLikeRequest {
    pub agent_id: Option<String>,
    pub user_email: Option<String>,
}

impl ToggleLikeRequest {
    pub fn validate(self) -> Result<(String, String), String> {
        let agent_id = self
            .agent_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| "agentId is required".to_string())?;
        let user_email = required_email(self.user_email)?;

        Ok((agent_id, user_email))
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct SetLinkRequest {
    pub email: Option<String>,
    pub title: Option<String>,
    pub link: Option<String>,
}

impl SetLinkRequest {
    pub fn validate(self) -> Result<(String, AgentLink), String> {
        let email = required_email(self.email)?;
        let title = self.title.unwrap_or_default().parse::<LinkTitle>()?;
        let link = self.link.map(|l| l.trim().to_string()).unwrap_or_default();

        let has_host = link
            .strip_prefix("https://")
            .or_else(|| link.strip_prefix("http://"))
            .map(|rest| !rest.is_empty() && !rest.starts_with('/'))
            .unwrap_or(false);
        if !has_host {
            return Err("link must be an http(s) URL".to_string());
        }

        Ok((email, AgentLink { title, link }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vip_levels_follow_wagered_amount() {
        assert_eq!(vip_level(Decimal::ZERO), 0);
        assert_eq!(vip_level(Decimal::from(999)), 0);
        assert_eq!(vip_level(Decimal::from(1_000)), 1);
        assert_eq!(vip_level(Decimal::from(49_999)), 2);
        assert_eq!(vip_level(Decimal::from(99_999)), 3);
        assert_eq!(vip_level(Decimal::from(100_000)), 4);
    }

    #[test]
    fn redirect_follows_role() {
        assert_eq!(Role::Admin.redirect_path(), "/admin");
        assert_eq!(Role::Agent.redirect_path(), "/agent");
        assert_eq!(Role::User.redirect_path(), "/");
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User::new("Ann", "ann@example.com", "secret-hash".into(), Role::User, "ABCD1234".into());
        let json = serde_json::to_string(&user).unwrap();

        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("passwordHash"));
    }

    #[test]
    fn sign_up_validation() {
        let request = |email: &str, password: &str| SignUpRequest {
            name: Some("Ann".into()),
            email: Some(email.into()),
            password: Some(password.into()),
            referral: Some(" abcd1234 ".into()),
        };

        let sign_up = request("Ann@Example.com", "hunter22").validate().unwrap();
        assert_eq!(sign_up.email, "ann@example.com");
        assert_eq!(sign_up.referral.as_deref(), Some("ABCD1234"));

        assert!(request("not-an-email", "hunter22").validate().is_err());
        assert!(request("ann@example.com", "short").validate().is_err());
    }

    #[test]
    fn categories_parse() {
        assert_eq!("".parse::<UserCategory>().unwrap(), UserCategory::All);
        assert_eq!("Agent".parse::<UserCategory>().unwrap(), UserCategory::Role(Role::Agent));
        assert_eq!("balance".parse::<UserCategory>().unwrap(), UserCategory::Balance);
        assert!("richest".parse::<UserCategory>().is_err());
    }

    #[test]
    fn agent_links_must_be_http() {
        let request = |title: &str, link: &str| SetLinkRequest {
            email: Some("agent@example.com".into()),
            title: Some(title.into()),
            link: Some(link.into()),
        };

        assert!(request("whatsapp", "https://wa.me/123").validate().is_ok());
        assert!(request("telegram", "http://t.me/agent").validate().is_ok());
        assert!(request("telegram", "ftp://t.me/agent").validate().is_err());
        assert!(request("telegram", "https://").validate().is_err());
        assert!(request("facebook", "https://fb.me/agent").validate().is_err());
    }
}
