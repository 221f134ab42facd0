use askama::Template;

use crate::email::{Email, Recipient};
use crate::models::user::{User, UserStatus};

/// Tells the admin someone signed up and needs approving.
#[derive(Template)]
#[template(path = "new-signup.html")]
pub struct NewSignupEmail<'a> {
    pub admin_address: &'a str,
    pub user: &'a User,
    pub review_url: String,
}

impl<'a> NewSignupEmail<'a> {
    pub fn new(admin_address: &'a str, user: &'a User, frontend_url: &str) -> Self {
        Self {
            admin_address,
            user,
            review_url: format!("{}/admin", frontend_url.trim_end_matches('/')),
        }
    }
}

impl<'a> Email for NewSignupEmail<'a> {
    fn subject(&self) -> String {
        format!("New Account Awaiting Approval: {}", self.user.name)
    }

    fn recipient(&self) -> Recipient {
        Recipient::address(self.admin_address)
    }
}

#[derive(Template)]
#[template(path = "account-decision.html")]
pub struct AccountDecisionEmail<'a> {
    pub user: &'a User,
    pub approved: bool,
    pub reason: Option<&'a str>,
    pub login_url: String,
}

impl<'a> AccountDecisionEmail<'a> {
    pub fn new(user: &'a User, reason: Option<&'a str>, frontend_url: &str) -> Self {
        Self {
            user,
            approved: user.status == UserStatus::Approved,
            reason,
            login_url: format!("{}/login", frontend_url.trim_end_matches('/')),
        }
    }
}

impl<'a> Email for AccountDecisionEmail<'a> {
    fn subject(&self) -> String {
        if self.approved {
            "Your Seminar Hall Account Was Approved".to_owned()
        } else {
            "Your Seminar Hall Account Was Not Approved".to_owned()
        }
    }

    fn recipient(&self) -> Recipient {
        Recipient::named(&self.user.name, &self.user.email)
    }
}
