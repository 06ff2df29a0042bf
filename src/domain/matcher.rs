use std::path::Path;

/// 提取文件扩展名（最后一个路径段中最后一个 '.' 之后的部分）
///
/// 以 '.' 开头且不含其他 '.' 的文件名（如 `.bashrc`）没有扩展名。
pub fn extension_of(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

/// 检查文件扩展名是否等于过滤器（不区分大小写）
///
/// 空过滤器永远不匹配。
pub fn matches(path: &Path, filter: &str) -> bool {
    if filter.is_empty() {
        return false;
    }

    match extension_of(path) {
        Some(ext) => ext.to_lowercase() == filter.to_lowercase(),
        None => false,
    }
}

/// 规范化扩展名过滤器：去掉空白和前导 '.'，转为小写
pub fn normalize_filter(raw: &str) -> String {
    raw.trim().trim_start_matches('.').to_lowercase()
}
