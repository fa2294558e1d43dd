use serde::{Deserialize, Serialize};

use crate::models::{trim, trim_lower, Model};
use crate::validation::{FieldError, Validator};

/// Contact address used when the settings singleton is created implicitly.
pub const DEFAULT_CONTACT_EMAIL: &str = "contact@anergia.com";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialLinks {
    pub facebook: String,
    pub instagram: String,
    pub linkedin: String,
    pub twitter: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeroSection {
    pub title: String,
    pub subtitle: String,
    pub image: String,
    pub video: String,
}

/// Site-wide settings; a single document per deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebsiteSettings {
    pub site_name: String,
    pub logo: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub address: String,
    pub social_links: SocialLinks,
    pub footer_text: String,
    pub hero: HeroSection,
}

impl Default for WebsiteSettings {
    fn default() -> Self {
        Self {
            site_name: "Anergia".to_string(),
            logo: String::new(),
            contact_email: DEFAULT_CONTACT_EMAIL.to_string(),
            contact_phone: String::new(),
            address: String::new(),
            social_links: SocialLinks::default(),
            footer_text: String::new(),
            hero: HeroSection::default(),
        }
    }
}

impl Model for WebsiteSettings {
    const COLLECTION: &'static str = "websitesettings";

    fn normalize(&mut self) {
        trim(&mut self.site_name);
        trim(&mut self.logo);
        trim_lower(&mut self.contact_email);
        trim(&mut self.contact_phone);
        trim(&mut self.address);
        trim(&mut self.footer_text);
        for link in [
            &mut self.social_links.facebook,
            &mut self.social_links.instagram,
            &mut self.social_links.linkedin,
            &mut self.social_links.twitter,
            &mut self.hero.title,
            &mut self.hero.subtitle,
            &mut self.hero.image,
            &mut self.hero.video,
        ] {
            trim(link);
        }
    }

    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Validator::new()
            .required("siteName", &self.site_name, "Site name is required")
            .required("contactEmail", &self.contact_email, "Contact email is required")
            .email("contactEmail", &self.contact_email, "Please provide a valid email")
            .finish()
    }
}
