use askama::Template;

#[derive(Template)]
#[template(path = "emails/rental_request.txt")]
pub struct RentalRequestEmail {
    pub provider_name: String,
    pub renter_name: String,
    pub job_title: String,
    pub start_date: String,
    pub end_date: String,
    /// Pre-formatted "3 x Scissor lift" lines
    pub lines: Vec<String>,
    pub has_price: bool,
    pub price: String,
}

#[derive(Template)]
#[template(path = "emails/offer_received.txt")]
pub struct OfferReceivedEmail {
    pub receiver_name: String,
    pub sender_name: String,
    pub job_title: String,
    pub version: i32,
    pub price: String,
    pub notes: String,
}

#[derive(Template)]
#[template(path = "emails/handshake_confirmed.txt")]
pub struct HandshakeConfirmedEmail {
    pub company_name: String,
    pub counterparty_name: String,
    pub job_title: String,
    pub price: String,
    pub lines: Vec<String>,
}

#[derive(Template)]
#[template(path = "emails/negotiation_cancelled.txt")]
pub struct NegotiationCancelledEmail {
    pub company_name: String,
    pub counterparty_name: String,
    pub job_title: String,
    pub reason: String,
}

#[derive(Template)]
#[template(path = "emails/job_completed.txt")]
pub struct JobCompletedEmail {
    pub company_name: String,
    pub renter_name: String,
    pub job_title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offer_email_renders_notes_only_when_present() {
        let mut email = OfferReceivedEmail {
            receiver_name: "Lift Co".to_string(),
            sender_name: "Stage Builders".to_string(),
            job_title: "Festival rigging".to_string(),
            version: 2,
            price: "1450.00".to_string(),
            notes: String::new(),
        };
        let body = email.render().unwrap();
        assert!(body.contains("offer v2"));
        assert!(body.contains("1450.00"));
        assert!(!body.contains("Notes:"));

        email.notes = "delivery included".to_string();
        assert!(email.render().unwrap().contains("Notes: delivery included"));
    }

    #[test]
    fn test_rental_request_lists_every_line() {
        let email = RentalRequestEmail {
            provider_name: "Lift Co".to_string(),
            renter_name: "Stage Builders".to_string(),
            job_title: "Festival rigging".to_string(),
            start_date: "2024-06-01".to_string(),
            end_date: "2024-06-03".to_string(),
            lines: vec!["3 x Scissor lift".to_string(), "1 x Generator".to_string()],
            has_price: false,
            price: String::new(),
        };
        let body = email.render().unwrap();
        assert!(body.contains("- 3 x Scissor lift"));
        assert!(body.contains("- 1 x Generator"));
        assert!(!body.contains("Opening price"));
    }
}
