//! OAI-PMH request construction.

use url::Url;

use cmm_indexer_shared::Repository;

/// An OAI-PMH request against one repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OaiRequest {
    /// `ListIdentifiers`, either the first page or a continuation.
    ListIdentifiers { resumption_token: Option<String> },
    /// `GetRecord` for one identifier.
    GetRecord { identifier: String },
}

impl OaiRequest {
    /// First page of identifiers.
    pub fn list_identifiers() -> Self {
        Self::ListIdentifiers {
            resumption_token: None,
        }
    }

    /// Continuation page for a resumption token.
    pub fn resume(token: impl Into<String>) -> Self {
        Self::ListIdentifiers {
            resumption_token: Some(token.into()),
        }
    }

    /// One record.
    pub fn get_record(identifier: impl Into<String>) -> Self {
        Self::GetRecord {
            identifier: identifier.into(),
        }
    }

    /// Build the request URL on top of a repository endpoint.
    ///
    /// A continuation request carries only the verb and the resumption
    /// token, as the protocol requires the token to be an exclusive argument.
    pub fn to_url(&self, endpoint: &Url, repo: &Repository) -> Url {
        let mut url = endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            match self {
                Self::ListIdentifiers {
                    resumption_token: Some(token),
                } => {
                    query.append_pair("verb", "ListIdentifiers");
                    query.append_pair("resumptionToken", token);
                }
                Self::ListIdentifiers {
                    resumption_token: None,
                } => {
                    query.append_pair("verb", "ListIdentifiers");
                    query.append_pair("metadataPrefix", &repo.preferred_metadata_param);
                    if let Some(set) = &repo.set_spec {
                        query.append_pair("set", set);
                    }
                }
                Self::GetRecord { identifier } => {
                    query.append_pair("verb", "GetRecord");
                    query.append_pair("identifier", identifier);
                    query.append_pair("metadataPrefix", &repo.preferred_metadata_param);
                }
            }
        }
        url
    }
}
