/// A file still waiting to be migrated, with the destination folders its
/// copy must land in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTask {
    pub file_id: String,
    pub parents: Vec<String>,
}

impl PendingTask {
    pub fn new(file_id: impl Into<String>, parents: Vec<String>) -> Self {
        Self {
            file_id: file_id.into(),
            parents,
        }
    }

    /// Staging file body: one destination parent ID per line.
    pub fn encode_parents(&self) -> String {
        let mut body = String::new();
        for parent in &self.parents {
            body.push_str(parent);
            body.push('\n');
        }
        body
    }

    pub fn decode(file_id: &str, body: &str) -> Self {
        let parents = body
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self::new(file_id, parents)
    }
}
