//! Shared services handed to every command handler

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::store::{ChatBoard, MetadataStore};
use crate::transfer::TransferLimits;

/// State shared by all connection workers
pub struct Services {
    /// External metadata store
    pub store: Arc<dyn MetadataStore>,

    /// In-memory chat messages
    pub chat: ChatBoard,

    /// Root for assignment submissions
    pub submissions_dir: PathBuf,

    /// Root for lecture videos
    pub videos_dir: PathBuf,

    /// Upload cap and chunk size
    pub limits: TransferLimits,
}

impl Services {
    /// Build services from config, creating the file roots if needed
    pub fn new(config: &Config, store: Arc<dyn MetadataStore>) -> Result<Self> {
        let submissions_dir = config.submissions_dir();
        let videos_dir = config.videos_dir();

        fs::create_dir_all(&submissions_dir)?;
        fs::create_dir_all(&videos_dir)?;

        Ok(Self {
            store,
            chat: ChatBoard::new(),
            submissions_dir,
            videos_dir,
            limits: config.transfer_limits(),
        })
    }
}
