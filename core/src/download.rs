// core/src/download.rs

//! Saving the QR image to the customer's device.
//!
//! Every failure degrades to a less convenient path: share sheet, then a
//! direct download, then opening the original image URL.

use crate::error::CheckoutError;
use crate::ports::{ImageFetcher, Notice, Notifier, QrFile, SavePlatform, ShareError};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
  /// No QR data to download.
  Skipped,
  Shared,
  /// The share sheet was closed by the customer. Counts as done.
  ShareDismissed,
  Downloaded,
  /// The original URL was opened for manual saving.
  OpenedExternally,
}

pub fn qr_file_name(order_id: &str) -> String {
  format!("qris-{order_id}.png")
}

pub(crate) async fn save_qr_image(
  qris_url: &str,
  order_id: &str,
  fetcher: &dyn ImageFetcher,
  platform: &dyn SavePlatform,
  notifier: &dyn Notifier,
  fetch_timeout: Duration,
) -> DownloadOutcome {
  let fetched = tokio::time::timeout(fetch_timeout, fetcher.fetch(qris_url))
    .await
    .unwrap_or_else(|_| Err(CheckoutError::Timeout { operation: "QR image fetch" }));
  let image = match fetched {
    Ok(image) => image,
    Err(e) => {
      warn!(error = %e, order_id, "Fetching QR image failed; opening original URL.");
      return open_fallback(qris_url, platform, notifier);
    }
  };
  let file = QrFile {
    file_name: qr_file_name(order_id),
    image,
  };

  if let Some(share) = platform.share_capability() {
    match share.share(&file).await {
      Ok(()) => {
        info!(order_id, "QR image shared.");
        return DownloadOutcome::Shared;
      }
      Err(ShareError::Dismissed) => return DownloadOutcome::ShareDismissed,
      Err(ShareError::Failed(reason)) => {
        warn!(%reason, order_id, "Share failed; falling back to download.");
      }
    }
  }

  match platform.download(&file).await {
    Ok(()) => {
      notifier.notify(Notice::success("QR code downloaded."));
      DownloadOutcome::Downloaded
    }
    Err(e) => {
      warn!(error = %e, order_id, "Direct download failed; opening original URL.");
      open_fallback(qris_url, platform, notifier)
    }
  }
}

fn open_fallback(qris_url: &str, platform: &dyn SavePlatform, notifier: &dyn Notifier) -> DownloadOutcome {
  platform.open_external(qris_url);
  notifier.notify(Notice::info(
    "QR code opened in a new tab. Press and hold (or right-click) the image to save it.",
  ));
  DownloadOutcome::OpenedExternally
}
