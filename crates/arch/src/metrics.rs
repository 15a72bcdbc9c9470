//! Martin 组件指标

/// 保留两位小数 (银行家舍入)
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// I = Cout / (Cin + Cout)；没有任何依赖的组件记为 1
pub fn instability(in_deps: usize, out_deps: usize) -> f64 {
    let total = in_deps + out_deps;
    if total == 0 {
        return 1.0;
    }
    round2(out_deps as f64 / total as f64)
}

/// A = 抽象类型数 / 类型总数；没有声明任何类型时记为 1
pub fn abstraction(abstract_count: usize, concrete_count: usize) -> f64 {
    let total = abstract_count + concrete_count;
    if total == 0 {
        return 1.0;
    }
    round2(abstract_count as f64 / total as f64)
}

/// 到主序列 I + A = 1 的距离
pub fn error(instability: f64, abstraction: f64) -> f64 {
    round2((instability + abstraction - 1.0).abs())
}

/// 算术平均，空集合为 0
pub fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        return 0.0;
    }
    round2(sum / count as f64)
}
