use std::result;

use thiserror::Error;

use crate::model::RecordId;
use crate::validate::FieldErrors;

/// 远程集合服务调用失败
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{op} /{collection} 请求失败: {message}")]
    Transport {
        op: &'static str,
        collection: &'static str,
        message: String,
    },
    #[error("{op} /{collection} 返回状态码 {status}")]
    Status {
        op: &'static str,
        collection: &'static str,
        status: u16,
    },
    #[error("{op} /{collection} 响应无法解析: {message}")]
    Decode {
        op: &'static str,
        collection: &'static str,
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("接口错误: {0}")]
    Api(#[from] ApiError),
    #[error("表单校验失败: {0}")]
    Validation(FieldErrors),
    #[error("未找到: 记录 {0} 不存在")]
    NotFound(RecordId),
    #[error("已有提交正在进行，请稍候")]
    Busy,
    #[error("没有待确认的删除操作")]
    NoPendingDelete,
    #[error("每页条数必须大于 0")]
    InvalidPageSize,
    #[error("命令错误: {0}")]
    Command(String),
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
    #[error("输入错误: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
}

pub type Result<T> = result::Result<T, AdminError>;
