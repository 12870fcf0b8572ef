// Gateway module - controls public API for handlers
// Modules are private, only exported symbols are public

mod auth;
mod list;
mod list_item;
mod media;
mod metrics;
mod shared;

// Account and session handlers
pub use auth::{auth_state, delete_account, register, sign_in, sign_out, update_account};

// List handlers
pub use list::{add_list, delete_list, get_all_lists, get_list, slugify, update_list};

// List item handlers
pub use list_item::{add_list_item, delete_list_item, get_list_item, get_list_items};

// Upstream media handlers
pub use media::{media_routes, multi_search, trending, MediaKind};

pub use metrics::metrics_handler;
