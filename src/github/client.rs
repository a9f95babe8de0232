//! GitHub API client and the gateway built on it.
//!
//! REST covers labels, milestones, issues, branches, commits and workflow
//! runs. GraphQL covers what REST cannot express in one call: review
//! decisions, check rollups and Projects (v2) boards.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;

#[cfg(feature = "git")]
use crate::git::LocalRepository;

use super::gateway::{
    BoardItemRecord, GatewayError, GatewayResult, IssueQuery, IssueRecord, LabelRecord,
    MilestoneRecord, PullRequestRecord, QueryGateway, RunRecord,
};
use super::wire::{
    GraphQlResponse, ProjectsData, PullRequestsData, RepositoryData, RestIssue, RestLabel,
    RestMilestone, RestPullRef, WorkflowRunsResponse,
};

/// GraphQL page size ceiling.
const MAX_PAGE: usize = 100;

const PULL_REQUESTS_QUERY: &str = r#"
query($owner: String!, $name: String!, $states: [PullRequestState!], $first: Int!) {
  repository(owner: $owner, name: $name) {
    pullRequests(states: $states, first: $first, orderBy: {field: UPDATED_AT, direction: DESC}) {
      totalCount
      nodes {
        number
        title
        isDraft
        reviewDecision
        headRefName
        updatedAt
        mergedAt
        body
        commits(last: 1) { nodes { commit { statusCheckRollup { state } } } }
      }
    }
  }
}"#;

const PROJECT_COUNT_QUERY: &str = r#"
query($owner: String!, $name: String!) {
  repository(owner: $owner, name: $name) {
    projectsV2(first: 1) { totalCount }
  }
}"#;

const PROJECT_ITEMS_QUERY: &str = r#"
query($owner: String!, $name: String!, $field: String!) {
  repository(owner: $owner, name: $name) {
    projectsV2(first: 1) {
      totalCount
      nodes {
        items(first: 100) {
          nodes {
            fieldValueByName(name: $field) {
              ... on ProjectV2ItemFieldSingleSelectValue { name }
            }
            content {
              ... on Issue { number title state }
              ... on PullRequest { number title state }
              ... on DraftIssue { title }
            }
          }
        }
      }
    }
  }
}"#;

/// GitHub API client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    /// API base URL
    base_url: String,
    /// Repository owner
    owner: String,
    /// Repository name
    repo: String,
    /// GitHub API token
    token: String,
    /// HTTP client
    client: reqwest::Client,
}

impl GitHubClient {
    /// Create a new client with a per-request timeout.
    pub fn new(
        base_url: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> GatewayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!("steward/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            owner: owner.into(),
            repo: repo.into(),
            token: token.into(),
            client,
        })
    }

    /// Read the token from `GITHUB_TOKEN` or `GH_TOKEN`.
    pub fn token_from_env() -> Option<String> {
        std::env::var("GITHUB_TOKEN").or_else(|_| std::env::var("GH_TOKEN")).ok()
    }

    /// Get repository owner.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Get repository name.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Get the API URL for a path under this repository.
    fn repo_url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}/{}", self.base_url, self.owner, self.repo, path)
    }

    /// Make an authenticated request.
    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    /// Parse error response from GitHub API.
    async fn parse_error(response: reqwest::Response) -> GatewayError {
        let status = response.status().as_u16();

        match status {
            401 => GatewayError::Unauthorized,
            403 | 429 => {
                let exhausted = response
                    .headers()
                    .get("x-ratelimit-remaining")
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(|s| s == "0");
                if exhausted || status == 429 {
                    return GatewayError::RateLimited;
                }
                GatewayError::Api { status, message: "Forbidden".to_string() }
            }
            404 => GatewayError::NotFound(response.url().path().to_string()),
            _ => {
                let message = response
                    .json::<serde_json::Value>()
                    .await
                    .ok()
                    .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
                    .unwrap_or_else(|| format!("HTTP {}", status));
                GatewayError::Api { status, message }
            }
        }
    }

    /// GET a repository path and decode the JSON body.
    async fn get<T: DeserializeOwned>(&self, path: &str) -> GatewayResult<T> {
        let url = self.repo_url(path);
        tracing::debug!(%url, "GET");

        let response = self.request(reqwest::Method::GET, &url).send().await?;
        if !response.status().is_success() {
            return Err(Self::parse_error(response).await);
        }

        response.json().await.map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }

    /// Run a GraphQL query against this repository.
    async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        mut variables: serde_json::Value,
    ) -> GatewayResult<T> {
        variables["owner"] = serde_json::json!(self.owner);
        variables["name"] = serde_json::json!(self.repo);

        let url = format!("{}/graphql", self.base_url);
        let body = serde_json::json!({ "query": query, "variables": variables });

        let response = self.request(reqwest::Method::POST, &url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(Self::parse_error(response).await);
        }

        let payload: GraphQlResponse<RepositoryData<T>> =
            response.json().await.map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        if let Some(errors) = payload.errors.filter(|e| !e.is_empty()) {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(GatewayError::GraphQl(messages.join("; ")));
        }

        payload
            .data
            .map(|d| d.repository)
            .ok_or_else(|| GatewayError::InvalidResponse("missing data".to_string()))
    }

    /// Count milestones in any state.
    pub async fn count_milestones(&self) -> GatewayResult<usize> {
        let milestones: Vec<RestMilestone> = self.get("milestones?state=all&per_page=100").await?;
        Ok(milestones.len())
    }

    /// List open milestones.
    pub async fn list_open_milestones(&self) -> GatewayResult<Vec<MilestoneRecord>> {
        let milestones: Vec<RestMilestone> = self.get("milestones?state=open&per_page=100").await?;
        Ok(milestones.into_iter().map(MilestoneRecord::from).collect())
    }

    /// List all labels in the repository.
    pub async fn list_labels(&self) -> GatewayResult<Vec<LabelRecord>> {
        let labels: Vec<RestLabel> = self.get("labels?per_page=100").await?;
        Ok(labels.into_iter().map(LabelRecord::from).collect())
    }

    /// List issues, skipping pull requests the issues endpoint also returns.
    pub async fn list_issues(&self, query: &IssueQuery) -> GatewayResult<Vec<IssueRecord>> {
        let mut params = vec![
            format!("state={}", query.state.as_str()),
            format!("per_page={}", query.limit.clamp(1, MAX_PAGE)),
        ];
        if let Some(label) = &query.label {
            params.push(format!("labels={}", urlencoding::encode(label)));
        }

        let issues: Vec<RestIssue> = self.get(&format!("issues?{}", params.join("&"))).await?;
        Ok(issues
            .into_iter()
            .filter(|i| i.pull_request.is_none())
            .map(IssueRecord::from)
            .collect())
    }

    /// Count pull requests in any state whose head is `branch`.
    pub async fn count_pull_requests_for_branch(&self, branch: &str) -> GatewayResult<usize> {
        let head = format!("{}:{}", self.owner, branch);
        let path = format!("pulls?state=all&per_page=1&head={}", urlencoding::encode(&head));
        let pulls: Vec<RestPullRef> = self.get(&path).await?;
        Ok(pulls.len())
    }

    /// List branch names.
    pub async fn list_branches(&self) -> GatewayResult<Vec<String>> {
        #[derive(Deserialize)]
        struct Branch {
            name: String,
        }

        let branches: Vec<Branch> = self.get("branches?per_page=100").await?;
        Ok(branches.into_iter().map(|b| b.name).collect())
    }

    /// Time of the latest commit touching `path`.
    pub async fn last_commit_time(&self, path: &str) -> GatewayResult<Option<DateTime<Utc>>> {
        #[derive(Deserialize)]
        struct Person {
            date: DateTime<Utc>,
        }
        #[derive(Deserialize)]
        struct CommitInfo {
            committer: Person,
        }
        #[derive(Deserialize)]
        struct CommitEntry {
            commit: CommitInfo,
        }

        let entries: Vec<CommitEntry> =
            self.get(&format!("commits?per_page=1&path={}", urlencoding::encode(path))).await?;
        Ok(entries.into_iter().next().map(|c| c.commit.committer.date))
    }

    /// List the most recent workflow runs.
    pub async fn list_runs(&self, limit: usize) -> GatewayResult<Vec<RunRecord>> {
        let response: WorkflowRunsResponse =
            self.get(&format!("actions/runs?per_page={}", limit.clamp(1, MAX_PAGE))).await?;
        Ok(response.workflow_runs.into_iter().map(RunRecord::from).collect())
    }

    /// List pull requests in the given GraphQL states, most recently updated first.
    pub async fn list_pull_requests(
        &self,
        states: &[&str],
        limit: usize,
    ) -> GatewayResult<Vec<PullRequestRecord>> {
        let data: PullRequestsData = self
            .graphql(
                PULL_REQUESTS_QUERY,
                serde_json::json!({ "states": states, "first": limit.clamp(1, MAX_PAGE) }),
            )
            .await?;
        Ok(data.pull_requests.nodes.into_iter().map(PullRequestRecord::from).collect())
    }

    /// Count Projects (v2) boards linked to the repository.
    pub async fn count_projects(&self) -> GatewayResult<usize> {
        let data: ProjectsData =
            self.graphql(PROJECT_COUNT_QUERY, serde_json::json!({})).await?;
        Ok(data.projects_v2.total_count)
    }

    /// Items of the first project board, with the value of `status_field`.
    pub async fn list_project_items(
        &self,
        status_field: &str,
    ) -> GatewayResult<Vec<BoardItemRecord>> {
        let data: ProjectsData = self
            .graphql(PROJECT_ITEMS_QUERY, serde_json::json!({ "field": status_field }))
            .await?;

        Ok(data
            .projects_v2
            .nodes
            .into_iter()
            .next()
            .map(|p| p.items.nodes.into_iter().map(BoardItemRecord::from).collect())
            .unwrap_or_default())
    }
}

/// [`QueryGateway`] backed by the GitHub API and, when available, a local clone.
///
/// Without a clone, branches and path timestamps come from the REST API,
/// which is always current, so refreshing is a no-op.
pub struct GitHubGateway {
    client: GitHubClient,
    remote: String,
    status_field: String,
    #[cfg(feature = "git")]
    local: Option<LocalRepository>,
}

impl GitHubGateway {
    /// Create a gateway without a local clone.
    pub fn new(
        client: GitHubClient,
        remote: impl Into<String>,
        status_field: impl Into<String>,
    ) -> Self {
        Self {
            client,
            remote: remote.into(),
            status_field: status_field.into(),
            #[cfg(feature = "git")]
            local: None,
        }
    }

    /// Use a local clone for branch refresh and path timestamps.
    #[cfg(feature = "git")]
    pub fn with_local(mut self, local: Option<LocalRepository>) -> Self {
        self.local = local;
        self
    }
}

#[async_trait]
impl QueryGateway for GitHubGateway {
    async fn count_milestones(&self) -> GatewayResult<usize> {
        self.client.count_milestones().await
    }

    async fn list_labels(&self) -> GatewayResult<Vec<LabelRecord>> {
        self.client.list_labels().await
    }

    async fn count_project_boards(&self) -> GatewayResult<usize> {
        self.client.count_projects().await
    }

    async fn list_open_milestones(&self) -> GatewayResult<Vec<MilestoneRecord>> {
        self.client.list_open_milestones().await
    }

    async fn list_open_pull_requests(&self) -> GatewayResult<Vec<PullRequestRecord>> {
        self.client.list_pull_requests(&["OPEN"], MAX_PAGE).await
    }

    async fn list_merged_pull_requests(
        &self,
        limit: usize,
    ) -> GatewayResult<Vec<PullRequestRecord>> {
        self.client.list_pull_requests(&["MERGED"], limit).await
    }

    async fn refresh_remote_branches(&self) -> GatewayResult<()> {
        #[cfg(feature = "git")]
        {
            if let Some(local) = &self.local {
                return local.fetch(&self.remote).await;
            }
        }
        Ok(())
    }

    async fn list_remote_branches(&self) -> GatewayResult<Vec<String>> {
        #[cfg(feature = "git")]
        {
            if let Some(local) = &self.local {
                return local.remote_branches(&self.remote).await;
            }
        }
        self.client.list_branches().await
    }

    async fn count_pull_requests_for_branch(&self, branch: &str) -> GatewayResult<usize> {
        self.client.count_pull_requests_for_branch(branch).await
    }

    async fn list_issues(&self, query: IssueQuery) -> GatewayResult<Vec<IssueRecord>> {
        self.client.list_issues(&query).await
    }

    async fn list_board_items(&self) -> GatewayResult<Vec<BoardItemRecord>> {
        self.client.list_project_items(&self.status_field).await
    }

    async fn list_recent_runs(&self, limit: usize) -> GatewayResult<Vec<RunRecord>> {
        self.client.list_runs(limit).await
    }

    async fn last_modified(&self, paths: &[String]) -> GatewayResult<Option<DateTime<Utc>>> {
        #[cfg(feature = "git")]
        {
            if let Some(local) = &self.local {
                return local.last_commit_time(paths).await;
            }
        }

        let mut latest = None;
        for path in paths {
            let time = self.client.last_commit_time(path).await?;
            latest = latest.max(time);
        }
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GitHubClient {
        GitHubClient::new("https://api.github.com/", "acme", "forum", "t", Duration::from_secs(5))
            .unwrap()
    }

    #[test]
    fn test_repo_url() {
        let c = client();
        assert_eq!(c.repo_url("labels"), "https://api.github.com/repos/acme/forum/labels");
        assert_eq!(c.owner(), "acme");
        assert_eq!(c.repo(), "forum");
    }

    #[test]
    fn test_queries_request_needed_fields() {
        assert!(PULL_REQUESTS_QUERY.contains("statusCheckRollup"));
        assert!(PULL_REQUESTS_QUERY.contains("reviewDecision"));
        assert!(PROJECT_ITEMS_QUERY.contains("fieldValueByName"));
    }
}
