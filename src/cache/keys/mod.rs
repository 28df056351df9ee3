/// 缓存键模块
/// 提供各种缓存键生成函数
pub mod session_keys;
pub mod token_keys;

pub use session_keys::session_key;
pub use token_keys::{token_key, token_lookup_key};

/// 默认缓存命名空间
pub const DEFAULT_PREFIX: &str = "app";

/// 生成带命名空间的缓存键
pub fn prefixed_key(prefix: &str, key: &str) -> String {
    format!("{}:{}", prefix, key)
}

/// 由查询参数生成确定性的缓存键后缀
///
/// 丢弃值为 `None` 的参数，按参数名排序后以 `k:v` 形式用 `|` 连接；
/// 没有剩余参数时返回 `"default"`。结果与参数的传入顺序无关。
pub fn create_key_from_params<I, K, V>(params: I) -> String
where
    I: IntoIterator<Item = (K, Option<V>)>,
    K: Into<String>,
    V: ToString,
{
    let mut pairs: Vec<(String, String)> = params
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k.into(), v.to_string())))
        .collect();

    if pairs.is_empty() {
        return "default".to_string();
    }

    pairs.sort();
    pairs
        .iter()
        .map(|(k, v)| format!("{}:{}", k, v))
        .collect::<Vec<_>>()
        .join("|")
}
