//! 房产应用推送通知分发
//!
//! 把房源匹配、新消息、房源状态变更与付款提醒四类业务事件渲染为法语推送通知，
//! 通过 FCM 投递到单个设备或订阅主题。模板与推送数据的生成是纯函数，
//! 推送后端与用户、房源目录均以 trait 注入。

pub mod backend;
pub mod cli;
pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod message;
pub mod payload;
pub mod service;
pub mod templates;

pub use dispatcher::{DispatchResult, Dispatcher};
pub use error::NotificationError;
pub use service::NotificationService;
