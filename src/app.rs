//! Application context.
//!
//! Wires stores, the event bus, the services and the listener loops into
//! one running unit, and holds the state fixed at bootstrap (website
//! settings, the comment in-flight guard).
//!
//! ## Topic wiring
//! ```text
//! post       -> category counts, tag counts, website totals,
//!               comment cleanup, file index
//! comment    -> post comment count, website totals
//! category   -> website totals
//! tag        -> website totals
//! post-like  -> website totals
//! ```

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::bus::{spawn_listener, topics, BusError, ChannelConfig, ChannelEventBus, EventBus};
use crate::config::{CommentConfig, Config, ConfigError, StorageConfig};
use crate::domain::{Comment, LatestComment, Post, PostInfo, Reply, TaxonomyKind, UserInfo};
use crate::notify::Notifier;
use crate::services::{
    CommentCleanupListener, CommentService, CountStatsService, FileIndexListener,
    FileIndexService, PostCommentListener, PostLikeService, PostService, ServiceError,
    TaxonomyPostListener, TaxonomyService, WebsiteCommentListener, WebsiteLikeListener,
    WebsitePostListener, WebsiteTaxonomyListener,
};
use crate::storage::{
    init_count_stats_store, CommentStore, CountStatsStore, FileIndexStore, MemoryCommentStore,
    MemoryCountStatsStore, MemoryFileIndexStore, MemoryPostLikeStore, MemoryPostStore,
    MemoryTaxonomyStore, PostLikeStore, PostStore, StorageError, TaxonomyStore,
};
use crate::utils::inflight::{InFlightGuard, InFlightSet};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Every store the application needs.
#[derive(Clone)]
pub struct Stores {
    pub comments: Arc<dyn CommentStore>,
    pub posts: Arc<dyn PostStore>,
    pub taxonomies: Arc<dyn TaxonomyStore>,
    pub counters: Arc<dyn CountStatsStore>,
    pub likes: Arc<dyn PostLikeStore>,
    pub files: Arc<dyn FileIndexStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            comments: Arc::new(MemoryCommentStore::new()),
            posts: Arc::new(MemoryPostStore::new()),
            taxonomies: Arc::new(MemoryTaxonomyStore::new()),
            counters: Arc::new(MemoryCountStatsStore::new()),
            likes: Arc::new(MemoryPostLikeStore::new()),
            files: Arc::new(MemoryFileIndexStore::new()),
        }
    }

    /// In-memory document stores with the configured counter backend.
    pub async fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        Ok(Self {
            counters: init_count_stats_store(config).await?,
            ..Self::in_memory()
        })
    }
}

/// Website settings captured at bootstrap.
#[derive(Debug, Clone)]
pub struct WebsiteState {
    /// Website counters already existed when this process started.
    pub initialized: bool,
    pub base_host: String,
    pub comment_enabled: bool,
}

impl WebsiteState {
    pub fn post_url(&self, post_id: &str) -> String {
        format!("{}/posts/{}", self.base_host.trim_end_matches('/'), post_id)
    }
}

pub struct AppContext {
    bus: Arc<ChannelEventBus>,
    posts: Arc<PostService>,
    comments: CommentService,
    categories: TaxonomyService,
    tags: TaxonomyService,
    counters: CountStatsService,
    likes: PostLikeService,
    files: FileIndexService,
    website: WebsiteState,
    comment_config: CommentConfig,
    submissions: InFlightSet,
    listeners: Vec<JoinHandle<()>>,
}

impl AppContext {
    /// Build the services, make sure the website counters exist, and start
    /// every listener loop. Listeners are subscribed before this returns.
    pub async fn bootstrap(
        config: &Config,
        stores: Stores,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, AppError> {
        let bus = Arc::new(ChannelEventBus::new(ChannelConfig::with_capacity(
            config.messaging.channel_capacity,
        )));
        let dyn_bus: Arc<dyn EventBus> = bus.clone();

        let posts = Arc::new(PostService::new(stores.posts.clone(), dyn_bus.clone()));
        let comments = CommentService::new(stores.comments.clone(), dyn_bus.clone(), notifier);
        let categories = TaxonomyService::new(
            TaxonomyKind::Category,
            stores.taxonomies.clone(),
            stores.counters.clone(),
            dyn_bus.clone(),
        );
        let tags = TaxonomyService::new(
            TaxonomyKind::Tag,
            stores.taxonomies.clone(),
            stores.counters.clone(),
            dyn_bus.clone(),
        );
        let counters = CountStatsService::new(stores.counters.clone());
        let likes = PostLikeService::new(stores.likes.clone(), posts.clone(), dyn_bus.clone());
        let files = FileIndexService::new(stores.files.clone());

        let created = counters.init_website_counters().await?;

        let b = bus.as_ref();
        let listeners = vec![
            spawn_listener(
                b,
                topics::POST,
                Arc::new(TaxonomyPostListener::new(
                    TaxonomyKind::Category,
                    stores.counters.clone(),
                )),
            )
            .await?,
            spawn_listener(
                b,
                topics::POST,
                Arc::new(TaxonomyPostListener::new(
                    TaxonomyKind::Tag,
                    stores.counters.clone(),
                )),
            )
            .await?,
            spawn_listener(
                b,
                topics::POST,
                Arc::new(WebsitePostListener::new(stores.counters.clone())),
            )
            .await?,
            spawn_listener(
                b,
                topics::POST,
                Arc::new(CommentCleanupListener::new(stores.comments.clone())),
            )
            .await?,
            spawn_listener(
                b,
                topics::POST,
                Arc::new(FileIndexListener::new(stores.files.clone())),
            )
            .await?,
            spawn_listener(
                b,
                topics::COMMENT,
                Arc::new(PostCommentListener::new(stores.posts.clone())),
            )
            .await?,
            spawn_listener(
                b,
                topics::COMMENT,
                Arc::new(WebsiteCommentListener::new(stores.counters.clone())),
            )
            .await?,
            spawn_listener(
                b,
                topics::CATEGORY,
                Arc::new(WebsiteTaxonomyListener::new(
                    TaxonomyKind::Category,
                    stores.counters.clone(),
                )),
            )
            .await?,
            spawn_listener(
                b,
                topics::TAG,
                Arc::new(WebsiteTaxonomyListener::new(
                    TaxonomyKind::Tag,
                    stores.counters.clone(),
                )),
            )
            .await?,
            spawn_listener(
                b,
                topics::POST_LIKE,
                Arc::new(WebsiteLikeListener::new(stores.counters.clone())),
            )
            .await?,
        ];

        let website = WebsiteState {
            initialized: created == 0,
            base_host: config.website.base_host.clone(),
            comment_enabled: config.website.comment_enabled,
        };
        info!(
            listeners = listeners.len(),
            base_host = %website.base_host,
            comment_enabled = website.comment_enabled,
            "Application ready"
        );
        if !website.initialized {
            info!(created, "First start, website counters created");
        }

        Ok(Self {
            bus,
            posts,
            comments,
            categories,
            tags,
            counters,
            likes,
            files,
            website,
            comment_config: config.comment.clone(),
            submissions: InFlightSet::new(),
            listeners,
        })
    }

    pub fn bus(&self) -> &Arc<ChannelEventBus> {
        &self.bus
    }

    pub fn posts(&self) -> &PostService {
        &self.posts
    }

    pub fn comments(&self) -> &CommentService {
        &self.comments
    }

    pub fn taxonomies(&self, kind: TaxonomyKind) -> &TaxonomyService {
        match kind {
            TaxonomyKind::Category => &self.categories,
            TaxonomyKind::Tag => &self.tags,
        }
    }

    pub fn counters(&self) -> &CountStatsService {
        &self.counters
    }

    pub fn likes(&self) -> &PostLikeService {
        &self.likes
    }

    pub fn files(&self) -> &FileIndexService {
        &self.files
    }

    pub fn website(&self) -> &WebsiteState {
        &self.website
    }

    /// Public comment submission on a post.
    pub async fn submit_comment(
        &self,
        post_id: &str,
        content: impl Into<String>,
        user_info: UserInfo,
    ) -> Result<String, ServiceError> {
        let _guard = self.claim_submission(&user_info.ip)?;
        let post = self.open_post(post_id).await?;

        let comment = Comment::new(self.post_info(&post), content, user_info);
        let id = self.comments.add_comment(comment).await?;
        self.bump_visit(post_id).await;
        Ok(id)
    }

    /// Public reply submission under an approved comment.
    pub async fn submit_reply(
        &self,
        comment_id: &str,
        post_id: &str,
        content: impl Into<String>,
        user_info: UserInfo,
        reply_to_id: Option<String>,
    ) -> Result<String, ServiceError> {
        let _guard = self.claim_submission(&user_info.ip)?;
        self.open_post(post_id).await?;

        let reply = Reply::new(content, user_info, reply_to_id);
        let id = self.comments.add_reply(comment_id, post_id, reply).await?;
        self.bump_visit(post_id).await;
        Ok(id)
    }

    /// Latest approved comments and replies, sized by configuration.
    pub async fn latest_comments(&self) -> Result<Vec<LatestComment>, ServiceError> {
        self.comments
            .find_latest(self.comment_config.latest_limit)
            .await
    }

    /// Close the bus and wait for every listener to drain.
    pub async fn shutdown(self) {
        self.bus.close().await;
        for handle in self.listeners {
            if let Err(e) = handle.await {
                warn!(error = %e, "Listener task ended abnormally");
            }
        }
        info!("Application stopped");
    }

    fn claim_submission(&self, ip: &str) -> Result<InFlightGuard, ServiceError> {
        if ip.is_empty() {
            return Err(ServiceError::InvalidIp);
        }
        self.submissions
            .try_acquire(ip)
            .ok_or(ServiceError::RequestInProgress)
    }

    /// A displayed post that accepts comments, on a site with comments on.
    async fn open_post(&self, post_id: &str) -> Result<Post, ServiceError> {
        if !self.website.comment_enabled {
            return Err(ServiceError::CommentsDisabled);
        }
        let post = self.posts.find_by_id(post_id).await?;
        if !post.is_displayed {
            return Err(ServiceError::PostNotFound(post_id.to_string()));
        }
        if !post.is_comment_allowed {
            return Err(ServiceError::CommentsDisabled);
        }
        Ok(post)
    }

    fn post_info(&self, post: &Post) -> PostInfo {
        PostInfo {
            post_id: post.id.clone(),
            post_title: post.title.clone(),
            post_url: self.website.post_url(&post.id),
        }
    }

    async fn bump_visit(&self, post_id: &str) {
        if let Err(e) = self.posts.increase_visit_count(post_id).await {
            warn!(post_id, error = %e, "Visit count update failed");
        }
    }
}
