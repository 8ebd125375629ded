use super::DataType;

/// Trait for integer element types that can be pooled.
///
/// Implementations fix the per-type data path at compile time: the max
/// identity, the widening rule into the 32-bit accumulator and the
/// saturating narrow back out of it.
pub trait PoolElement: Copy + Send + Sync + PartialEq + std::fmt::Debug + 'static {
    /// Runtime tag for this type.
    const DATA_TYPE: DataType;

    /// Smallest representable value; the identity of max.
    const LOWEST: Self;

    /// Lane-wise maximum.
    fn max_lane(self, other: Self) -> Self;

    /// Widen to the 32-bit accumulator, extending by signedness.
    fn widen(self) -> i32;

    /// Narrow from the 32-bit accumulator, clamping to the representable range.
    fn saturate_from(v: i32) -> Self;
}

impl PoolElement for i8 {
    const DATA_TYPE: DataType = DataType::S8;
    const LOWEST: Self = i8::MIN;

    #[inline(always)]
    fn max_lane(self, other: Self) -> Self {
        Ord::max(self, other)
    }

    #[inline(always)]
    fn widen(self) -> i32 {
        self as i32
    }

    #[inline(always)]
    fn saturate_from(v: i32) -> Self {
        v.clamp(i8::MIN as i32, i8::MAX as i32) as i8
    }
}

impl PoolElement for u8 {
    const DATA_TYPE: DataType = DataType::U8;
    const LOWEST: Self = u8::MIN;

    #[inline(always)]
    fn max_lane(self, other: Self) -> Self {
        Ord::max(self, other)
    }

    #[inline(always)]
    fn widen(self) -> i32 {
        self as i32
    }

    #[inline(always)]
    fn saturate_from(v: i32) -> Self {
        v.clamp(u8::MIN as i32, u8::MAX as i32) as u8
    }
}

impl PoolElement for i32 {
    const DATA_TYPE: DataType = DataType::S32;
    const LOWEST: Self = i32::MIN;

    #[inline(always)]
    fn max_lane(self, other: Self) -> Self {
        Ord::max(self, other)
    }

    #[inline(always)]
    fn widen(self) -> i32 {
        self
    }

    #[inline(always)]
    fn saturate_from(v: i32) -> Self {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowest_values() {
        assert_eq!(<i8 as PoolElement>::LOWEST, -128);
        assert_eq!(<u8 as PoolElement>::LOWEST, 0);
        assert_eq!(<i32 as PoolElement>::LOWEST, i32::MIN);
    }

    #[test]
    fn test_widen_by_signedness() {
        assert_eq!((-1i8).widen(), -1);
        assert_eq!(255u8.widen(), 255);
        assert_eq!(i32::MAX.widen(), i32::MAX);
    }

    #[test]
    fn test_saturate_s8() {
        assert_eq!(i8::saturate_from(200), 127);
        assert_eq!(i8::saturate_from(-200), -128);
        assert_eq!(i8::saturate_from(-5), -5);
    }

    #[test]
    fn test_saturate_u8() {
        assert_eq!(u8::saturate_from(300), 255);
        assert_eq!(u8::saturate_from(-1), 0);
        assert_eq!(u8::saturate_from(42), 42);
    }

    #[test]
    fn test_saturate_s32_is_identity() {
        assert_eq!(i32::saturate_from(i32::MIN), i32::MIN);
        assert_eq!(i32::saturate_from(123_456), 123_456);
    }

    #[test]
    fn test_max_lane() {
        assert_eq!((-3i8).max_lane(-7), -3);
        assert_eq!(200u8.max_lane(100), 200);
        assert_eq!(i32::MIN.max_lane(0), 0);
    }

    #[test]
    fn test_data_type_tags() {
        assert_eq!(<i8 as PoolElement>::DATA_TYPE, DataType::S8);
        assert_eq!(<u8 as PoolElement>::DATA_TYPE, DataType::U8);
        assert_eq!(<i32 as PoolElement>::DATA_TYPE, DataType::S32);
    }
}
