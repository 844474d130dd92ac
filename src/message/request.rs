use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Login<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubmission {
    pub language_type: i64,
    pub problem_id: i64,
}

#[derive(Debug, Serialize)]
pub struct Grade {
    pub score: i64,
}
