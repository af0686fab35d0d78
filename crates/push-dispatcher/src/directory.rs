//! 用户与房源目录
//!
//! 分发逻辑只依赖目录 trait，真实的数据层由应用方实现。`InMemoryDirectory`
//! 从 JSON 文件加载，供本地联调与测试使用。

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use immo_shared::error::SharedError;
use immo_shared::events::{ListingStatus, SearchCriteria};
use serde::{Deserialize, Serialize};

use crate::error::NotificationError;

/// 目录中的用户
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    /// 设备推送 token，用户未注册设备时为空
    #[serde(default)]
    pub push_token: Option<String>,
}

/// 目录中的房源
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    pub id: String,
    pub title: String,
    pub owner_id: String,
    pub status: ListingStatus,
}

/// 用户目录
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn lookup_user(&self, user_id: &str) -> Result<Option<UserRecord>, NotificationError>;

    /// 保存过相似搜索条件的用户，按目录中的顺序返回
    async fn lookup_users_matching_search(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<UserRecord>, NotificationError>;
}

/// 房源目录
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ListingDirectory: Send + Sync {
    async fn lookup_listing(
        &self,
        listing_id: &str,
    ) -> Result<Option<ListingRecord>, NotificationError>;
}

/// 用户保存的搜索
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSearch {
    pub user_id: String,
    pub criteria: SearchCriteria,
}

impl SavedSearch {
    /// 双方都给出的字段必须一致（忽略大小写），任一方缺省的字段不参与比较
    pub fn is_similar_to(&self, criteria: &SearchCriteria) -> bool {
        fn same(a: &Option<String>, b: &Option<String>) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                _ => true,
            }
        }

        same(&self.criteria.location, &criteria.location)
            && same(&self.criteria.property_type, &criteria.property_type)
            && same(&self.criteria.price_range, &criteria.price_range)
    }
}

/// 目录数据文件格式
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryFixture {
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub listings: Vec<ListingRecord>,
    #[serde(default)]
    pub saved_searches: Vec<SavedSearch>,
}

/// 内存目录
///
/// 构建后只读，可在多个分发任务间共享。
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    users: HashMap<String, UserRecord>,
    listings: HashMap<String, ListingRecord>,
    saved_searches: Vec<SavedSearch>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: UserRecord) -> Self {
        self.users.insert(user.id.clone(), user);
        self
    }

    pub fn with_listing(mut self, listing: ListingRecord) -> Self {
        self.listings.insert(listing.id.clone(), listing);
        self
    }

    pub fn with_saved_search(mut self, search: SavedSearch) -> Self {
        self.saved_searches.push(search);
        self
    }

    pub fn from_fixture(fixture: DirectoryFixture) -> Self {
        let directory = fixture
            .users
            .into_iter()
            .fold(Self::new(), |dir, user| dir.with_user(user));
        let directory = fixture
            .listings
            .into_iter()
            .fold(directory, |dir, listing| dir.with_listing(listing));
        fixture
            .saved_searches
            .into_iter()
            .fold(directory, |dir, search| dir.with_saved_search(search))
    }

    /// 从 JSON 文件加载目录
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, SharedError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SharedError::Io {
                path: path.display().to_string(),
                source,
            })?;
        let fixture: DirectoryFixture =
            serde_json::from_str(&raw).map_err(|source| SharedError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Self::from_fixture(fixture))
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn lookup_user(&self, user_id: &str) -> Result<Option<UserRecord>, NotificationError> {
        Ok(self.users.get(user_id).cloned())
    }

    async fn lookup_users_matching_search(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<UserRecord>, NotificationError> {
        let mut matched: Vec<UserRecord> = Vec::new();
        for search in self.saved_searches.iter().filter(|s| s.is_similar_to(criteria)) {
            // 同一用户多条相似搜索只通知一次
            if matched.iter().any(|u| u.id == search.user_id) {
                continue;
            }
            if let Some(user) = self.users.get(&search.user_id) {
                matched.push(user.clone());
            }
        }
        Ok(matched)
    }
}

#[async_trait]
impl ListingDirectory for InMemoryDirectory {
    async fn lookup_listing(
        &self,
        listing_id: &str,
    ) -> Result<Option<ListingRecord>, NotificationError> {
        Ok(self.listings.get(listing_id).cloned())
    }
}
