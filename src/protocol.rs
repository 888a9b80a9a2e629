//! Message kinds exchanged between the options page and its host.
//!
//! | Kind           | Direction   | Shape                                  |
//! |----------------|-------------|----------------------------------------|
//! | `i18n.cache`   | page → host | request, answered with the dictionary  |
//! | `options.init` | host → page | event, optional navigation target      |
//! | `tab.get`      | page → host | request, answered with a hash or null  |
//! | `tab.set`      | page → host | fire-and-forget, the shown tab hash    |

pub const I18N_CACHE: &str = "i18n.cache";
pub const OPTIONS_INIT: &str = "options.init";
pub const TAB_GET: &str = "tab.get";
pub const TAB_SET: &str = "tab.set";
