use crate::error::{ApiError, ApiResult};
use anilog_core::{Follow, FollowStatus, Storage};
use std::sync::Arc;
use tracing::{debug, info};

/// Follow relationships: absent, REQUESTED or FOLLOWING per (follower, followee).
pub struct FollowUseCase {
    storage: Arc<dyn Storage>,
}

impl FollowUseCase {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    async fn check_pair(&self, user_id: i64, target_id: i64) -> ApiResult<()> {
        if user_id == target_id {
            return Err(ApiError::bad_request("Users cannot follow themselves"));
        }
        let user = self.storage.get_user_by_id(user_id).await?;
        let target = self.storage.get_user_by_id(target_id).await?;
        if user.is_none() || target.is_none() {
            return Err(ApiError::bad_request("User not found"));
        }
        Ok(())
    }

    /// Absent or REQUESTED becomes FOLLOWING; FOLLOWING stays.
    pub async fn follow(&self, user_id: i64, target_id: i64) -> ApiResult<()> {
        self.check_pair(user_id, target_id).await?;

        if let Some(existing) = self.storage.get_follow(user_id, target_id).await? {
            if existing.status == FollowStatus::Following {
                debug!("User {} already follows {}", user_id, target_id);
                return Ok(());
            }
        }

        let mut follow = Follow::new(user_id, target_id, FollowStatus::Following);
        self.storage.save_follow(&mut follow).await?;
        info!("User {} now follows {}", user_id, target_id);
        Ok(())
    }

    pub async fn request(&self, user_id: i64, target_id: i64) -> ApiResult<()> {
        self.check_pair(user_id, target_id).await?;

        if self.storage.get_follow(user_id, target_id).await?.is_some() {
            return Err(ApiError::bad_request(
                "Already requested or following this user",
            ));
        }

        let mut follow = Follow::new(user_id, target_id, FollowStatus::Requested);
        self.storage.save_follow(&mut follow).await?;
        info!("User {} requested to follow {}", user_id, target_id);
        Ok(())
    }

    pub async fn unfollow(&self, user_id: i64, target_id: i64) -> ApiResult<()> {
        self.check_pair(user_id, target_id).await?;

        let removed = self.storage.delete_follow(user_id, target_id).await?;
        debug!("Unfollow {} -> {} removed row: {}", user_id, target_id, removed);
        Ok(())
    }

    /// `user_id` accepts the pending request sent by `requester_id`.
    pub async fn accept(&self, user_id: i64, requester_id: i64) -> ApiResult<()> {
        self.check_pair(user_id, requester_id).await?;

        match self.storage.get_follow(requester_id, user_id).await? {
            Some(mut follow) if follow.status == FollowStatus::Requested => {
                follow.status = FollowStatus::Following;
                self.storage.save_follow(&mut follow).await?;
                info!("User {} accepted follow request from {}", user_id, requester_id);
                Ok(())
            }
            _ => Err(ApiError::bad_request("No follow request found to accept")),
        }
    }

    pub async fn deny(&self, user_id: i64, requester_id: i64) -> ApiResult<()> {
        self.check_pair(user_id, requester_id).await?;

        match self.storage.get_follow(requester_id, user_id).await? {
            Some(follow) if follow.status == FollowStatus::Requested => {
                self.storage.delete_follow(requester_id, user_id).await?;
                info!("User {} denied follow request from {}", user_id, requester_id);
                Ok(())
            }
            _ => Err(ApiError::bad_request("No follow request found to deny")),
        }
    }

    /// Rows where the user follows someone, then rows where someone follows the user.
    pub async fn statuses(&self, user_id: i64) -> ApiResult<Vec<Follow>> {
        if self.storage.get_user_by_id(user_id).await?.is_none() {
            return Err(ApiError::bad_request("User not found"));
        }

        let mut follows = self.storage.get_follows_by_follower(user_id).await?;
        follows.extend(self.storage.get_follows_by_followee(user_id).await?);
        Ok(follows)
    }
}
