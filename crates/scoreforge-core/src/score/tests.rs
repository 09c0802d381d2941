//! Tests for score types.

use rust_decimal::Decimal;

use super::*;

mod simple_score {
    use super::*;

    #[test]
    fn test_comparison_and_feasibility() {
        assert!(SimpleScore::of(-3) > SimpleScore::of(-5));
        assert!(SimpleScore::of(0).is_feasible());
        assert!(!SimpleScore::of(-1).is_feasible());
    }

    #[test]
    fn test_parse() {
        assert_eq!(SimpleScore::parse("42").unwrap(), SimpleScore::of(42));
        assert_eq!(SimpleScore::parse(" -10 ").unwrap(), SimpleScore::of(-10));
        assert!(SimpleScore::parse("ten").is_err());
    }

    #[test]
    fn test_multiply_long_overflow() {
        assert_eq!(SimpleScore::of(3).multiply_long(4), Some(SimpleScore::of(12)));
        assert_eq!(SimpleScore::of(i64::MAX).multiply_long(2), None);
        assert_eq!(SimpleScore::of(3).multiply_decimal(Decimal::ONE), None);
        assert!(!SimpleScore::supports_decimal_weights());
    }

    #[test]
    fn test_checked_add_and_sub() {
        let max = SimpleScore::of(i64::MAX);
        assert_eq!(
            SimpleScore::of(2).checked_add(&SimpleScore::of(3)),
            Some(SimpleScore::of(5))
        );
        assert_eq!(max.checked_add(&SimpleScore::ONE), None);
        assert_eq!(SimpleScore::of(i64::MIN).checked_sub(&SimpleScore::ONE), None);
        assert_eq!(SimpleScore::ZERO.checked_sub(&max), Some(-max));
    }
}

mod hard_soft_score {
    use super::*;

    #[test]
    fn test_hard_dominates_soft() {
        let infeasible = HardSoftScore::of(-1, 0);
        let feasible = HardSoftScore::of(0, -1000);
        assert!(feasible > infeasible);
        assert!(HardSoftScore::of(-1, -1000) > HardSoftScore::of(-2, 0));
    }

    #[test]
    fn test_arithmetic() {
        let s1 = HardSoftScore::of(-1, -100);
        let s2 = HardSoftScore::of(-1, -50);
        assert_eq!(s1 + s2, HardSoftScore::of(-2, -150));
        assert_eq!(s1 - s2, HardSoftScore::of(0, -50));
        assert_eq!(-s1, HardSoftScore::of(1, 100));
        assert_eq!(s1.abs(), HardSoftScore::of(1, 100));
    }

    #[test]
    fn test_display_and_parse() {
        let score = HardSoftScore::of(-2, -30);
        assert_eq!(score.to_string(), "-2hard/-30soft");
        assert_eq!(HardSoftScore::parse("-2hard/-30soft").unwrap(), score);
        assert!(HardSoftScore::parse("-2hard").is_err());
        assert!(HardSoftScore::parse("-2hard/-30soft/0x").is_err());
        assert!(HardSoftScore::parse("-2/-30soft").is_err());
    }

    #[test]
    fn test_short_string() {
        assert_eq!(HardSoftScore::of(-2, 0).to_short_string(), "-2hard");
        assert_eq!(HardSoftScore::of(0, -7).to_short_string(), "-7soft");
        assert_eq!(HardSoftScore::ZERO.to_short_string(), "0");
    }

    #[test]
    fn test_levels() {
        assert_eq!(HardSoftScore::levels_count(), 2);
        assert_eq!(HardSoftScore::of(1, 2).to_level_numbers(), vec![1, 2]);
        assert_eq!(HardSoftScore::level_label(0), Some(ScoreLevel::Hard));
        assert_eq!(HardSoftScore::level_label(2), None);
    }
}

mod hard_medium_soft_score {
    use super::*;

    #[test]
    fn test_medium_dominates_soft() {
        assert!(HardMediumSoftScore::of(0, -5, -200) > HardMediumSoftScore::of(0, -10, -100));
        assert!(HardMediumSoftScore::of(0, -50, 0) > HardMediumSoftScore::of(-1, 0, 0));
    }

    #[test]
    fn test_parse_round_trip() {
        let score = HardMediumSoftScore::of(-1, -2, -3);
        assert_eq!(HardMediumSoftScore::parse(&score.to_string()).unwrap(), score);
    }

    #[test]
    fn test_multiply_long() {
        assert_eq!(
            HardMediumSoftScore::ONE_MEDIUM.multiply_long(7),
            Some(HardMediumSoftScore::of(0, 7, 0))
        );
    }
}

mod hard_soft_decimal_score {
    use super::*;

    #[test]
    fn test_creation() {
        let score = HardSoftDecimalScore::of(-2, -100);
        assert_eq!(score.hard_scaled(), -200000);
        assert_eq!(score.soft_scaled(), -10000000);
    }

    #[test]
    fn test_decimal_multiplication() {
        let weight = HardSoftDecimalScore::ONE_SOFT;
        let scaled = weight.multiply_decimal(Decimal::new(25, 1)).unwrap();
        assert_eq!(scaled, HardSoftDecimalScore::of_scaled(0, 250000));
        assert!(HardSoftDecimalScore::supports_decimal_weights());
    }

    #[test]
    fn test_display_strips_trailing_zeros() {
        assert_eq!(HardSoftDecimalScore::of(0, -100).to_string(), "0hard/-100soft");
        assert_eq!(
            HardSoftDecimalScore::of_scaled(-150000, -250000).to_string(),
            "-1.5hard/-2.5soft"
        );
    }

    #[test]
    fn test_parse() {
        let score = HardSoftDecimalScore::parse("-1.5hard/0.25soft").unwrap();
        assert_eq!(score, HardSoftDecimalScore::of_scaled(-150000, 25000));
        assert!(HardSoftDecimalScore::parse("1hard").is_err());
    }
}
