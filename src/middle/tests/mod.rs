//! 中间层测试
