//! Test utilities and mock implementations.
//!
//! This module provides mock collaborators and entity builders for unit
//! tests, without real notification backends or databases.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{
    CategoryRef, Comment, CoverImage, Post, PostInfo, Reply, TagRef, UserInfo,
};
use crate::notify::{NotifyError, Notifier};

/// A recorded `notify_user` call.
#[derive(Debug, Clone)]
pub struct UserNotification {
    pub template: String,
    pub emails: Vec<String>,
    pub args: HashMap<String, String>,
}

/// Notifier that records every call.
#[derive(Default)]
pub struct MockNotifier {
    webmaster: RwLock<Vec<String>>,
    users: RwLock<Vec<UserNotification>>,
    fail: RwLock<bool>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail(&self, fail: bool) {
        *self.fail.write().await = fail;
    }

    pub async fn webmaster_count(&self) -> usize {
        self.webmaster.read().await.len()
    }

    /// Recipients of every `notify_user` call with `template`.
    pub async fn emails_for(&self, template: &str) -> Vec<String> {
        self.users
            .read()
            .await
            .iter()
            .filter(|n| n.template == template)
            .flat_map(|n| n.emails.clone())
            .collect()
    }

    pub async fn user_notifications(&self) -> Vec<UserNotification> {
        self.users.read().await.clone()
    }

    /// Wait until `count` user notifications with `template` arrived.
    pub async fn wait_for_emails(&self, template: &str, count: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
        while self.emails_for(template).await.len() < count {
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {count} '{template}' notifications"
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    pub async fn wait_for_webmaster(&self, count: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
        while self.webmaster_count().await < count {
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {count} webmaster notifications"
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify_webmaster(&self, template: &str) -> Result<(), NotifyError> {
        if *self.fail.read().await {
            return Err(NotifyError::Delivery {
                template: template.to_string(),
                message: "mock failure".to_string(),
            });
        }
        self.webmaster.write().await.push(template.to_string());
        Ok(())
    }

    async fn notify_user(
        &self,
        template: &str,
        emails: &[String],
        args: &HashMap<String, String>,
    ) -> Result<(), NotifyError> {
        if *self.fail.read().await {
            return Err(NotifyError::Delivery {
                template: template.to_string(),
                message: "mock failure".to_string(),
            });
        }
        self.users.write().await.push(UserNotification {
            template: template.to_string(),
            emails: emails.to_vec(),
            args: args.clone(),
        });
        Ok(())
    }
}

pub fn user(name: &str, email: &str) -> UserInfo {
    UserInfo {
        name: name.to_string(),
        email: email.to_string(),
        ip: "127.0.0.1".to_string(),
        website: String::new(),
    }
}

pub fn post_info(post_id: &str) -> PostInfo {
    PostInfo {
        post_id: post_id.to_string(),
        post_title: format!("Post {post_id}"),
        post_url: format!("https://blog.example.com/posts/{post_id}"),
    }
}

/// Pending comment by `author` (email `<author>@example.com`).
pub fn comment(post_id: &str, author: &str) -> Comment {
    Comment::new(
        post_info(post_id),
        format!("comment by {author}"),
        user(author, &format!("{author}@example.com")),
    )
}

pub fn reply(author: &str, reply_to_id: Option<&str>) -> Reply {
    Reply::new(
        format!("reply by {author}"),
        user(author, &format!("{author}@example.com")),
        reply_to_id.map(str::to_string),
    )
}

pub fn post(id: &str, categories: &[&str], tags: &[&str], cover_file: Option<&str>) -> Post {
    let mut post = Post::new(format!("Post {id}"));
    post.id = id.to_string();
    post.categories = categories
        .iter()
        .map(|c| CategoryRef {
            id: c.to_string(),
            name: c.to_string(),
        })
        .collect();
    post.tags = tags
        .iter()
        .map(|t| TagRef {
            id: t.to_string(),
            name: t.to_string(),
        })
        .collect();
    post.cover = cover_file.map(|f| CoverImage {
        url: format!("/static/{f}.png"),
        file_id: f.to_string(),
    });
    post
}

pub fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}
