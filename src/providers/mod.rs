pub mod jira;
pub mod linearb;
