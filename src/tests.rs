#[cfg(test)]
mod tests {
    use crate::ir::{self, Cmp, Simplifier};
    use crate::{analyze_full, check, parse, printer, AnalysisOptions, AnalysisResult};
    use proptest::prelude::*;

    fn run(source: &str) -> AnalysisResult {
        analyze_full(source, &AnalysisOptions::default())
    }

    // --- end-to-end acceptance scenarios -----------------------------------

    #[test]
    fn scenario_1_linear_accumulation() {
        let result = run("begin s<-0  for i<-1 to n do begin s<-s+i end end");
        assert_eq!(result.big_o, "n");
        assert_eq!(result.lines.len(), 3);
        assert_eq!(result.execution_trace.unwrap().total_iterations, 5);
        assert_eq!(result.strong_bounds.unwrap().dominant_term, "n");
    }

    #[test]
    fn scenario_2_nested_loops() {
        let result = run("begin for i<-1 to n do begin for j<-1 to n do begin x<-1 end end end");
        assert_eq!(result.big_o, "n^2");
        // The acceptance table's own total_iterations figure for this
        // scenario (16) contradicts its own stated default of n=5 for a
        // nested loop, which would give 5*5=25; 25 is the only value
        // consistent with that default, so the simulator reports that one.
        assert_eq!(result.execution_trace.unwrap().total_iterations, 25);
        assert_eq!(result.strong_bounds.unwrap().dominant_term, "n^2");
    }

    #[test]
    fn scenario_3_halving_while() {
        let result = run("begin i<-n  while (i>1) do begin i<-i div 2 end end");
        assert_eq!(result.big_o, "log(n)");
    }

    #[test]
    fn scenario_4_factorial() {
        let result = run(
            "Fact(n) begin if (n<=1) then begin return 1 end else begin return n*Fact(n-1) end end",
        );
        assert_eq!(result.big_o, "n");
        assert_eq!(result.method_used, "iteration_method");
    }

    #[test]
    fn scenario_5_fibonacci() {
        let result = run(
            "Fib(n) begin if (n<=1) then begin return n end else begin return Fib(n-1)+Fib(n-2) end end",
        );
        assert_eq!(result.big_o, "2^n");
        assert_eq!(result.method_used, "characteristic_equation");
    }

    #[test]
    fn scenario_6_merge_sort() {
        let result = run(
            "Merge(A, lo, mid, hi) begin for k<-lo to hi do begin x<-1 end end \
             MergeSort(A, lo, hi) begin if (lo<hi) then begin m<-(lo+hi) div 2  CALL MergeSort(A, lo, m)  CALL MergeSort(A, m+1, hi)  CALL Merge(A, lo, m, hi) end end",
        );
        assert_eq!(result.big_o, "n*log(n)");
        assert_eq!(result.method_used, "master_theorem");
        assert!(result.strong_bounds.is_none());
        let equation = result.recurrence_equation.unwrap();
        assert!(equation.contains("2T(n/2)"));
        assert!(equation.contains("+ Θ(n)"));
    }

    // --- invariants, spot-checked -------------------------------------------

    #[test]
    fn invariant_1_every_begin_has_one_end() {
        let program = parse("begin for i<-1 to n do begin if (i>1) then begin x<-1 end end end")
            .ast
            .unwrap();
        assert_eq!(program.max_depth(), 3);
    }

    #[test]
    fn invariant_4_line_sum_matches_ir_worst() {
        let result = run("begin s<-0  for i<-1 to n do begin s<-s+i end end");
        // Every line's own cost is already folded into ir_worst by the walk;
        // the per-line record on the loop body carries the full multiplier.
        let has_n_multiplier = result
            .lines
            .iter()
            .any(|l| ir::pretty_ascii(&l.multiplier).contains('n'));
        assert!(has_n_multiplier);
    }

    fn nested_for_source(depth: u32) -> String {
        let mut src = String::from("begin ");
        for d in 0..depth {
            src.push_str(&format!("for i{}<-1 to n do begin ", d));
        }
        src.push_str("x<-1 ");
        for _ in 0..depth {
            src.push_str("end ");
        }
        src.push_str("end");
        src
    }

    proptest! {
        /// Invariant 5: a round trip through the pretty-printer preserves
        /// the main program's statement count (modulo whitespace).
        #[test]
        fn round_trip_preserves_statement_count(depth in 1u32..4) {
            let source = nested_for_source(depth);
            let program = parse(&source).ast.unwrap();
            let rendered = printer::render(&program);
            let reparsed = parse(&rendered).ast.unwrap();
            prop_assert_eq!(program.main_stmts().len(), reparsed.main_stmts().len());
        }

        /// Invariant 6: simplification is idempotent on whatever cost the
        /// iterative walk produces for an arbitrarily deep loop nest.
        #[test]
        fn simplify_is_idempotent_on_nested_loop_costs(depth in 1u32..4) {
            let source = nested_for_source(depth);
            let result = run(&source);
            let mut s = Simplifier::default();
            let twice = s.simplify(&result.ir_worst);
            prop_assert_eq!(twice, result.ir_worst);
        }

        /// Invariant 3: for an `if` whose branches are loops of different
        /// (numeric) trip counts, the best-case cost never exceeds the
        /// worst-case cost under asymptotic comparison.
        #[test]
        fn if_best_never_exceeds_worst(then_has_loop in any::<bool>(), else_has_loop in any::<bool>()) {
            let then_body = if then_has_loop { "for i<-1 to n do begin x<-1 end" } else { "x<-1" };
            let else_body = if else_has_loop { "for j<-1 to n do begin x<-1 end" } else { "x<-1" };
            let source = format!(
                "begin if (n>1) then begin {} end else begin {} end end",
                then_body, else_body
            );
            let result = run(&source);
            let checked = check(parse(&source).ast.unwrap());
            let _ = checked; // semantic pass must accept every generated variant
            prop_assert!(matches!(ir::cmp(&result.ir_best, &result.ir_worst), Cmp::Less | Cmp::Equal));
        }

        /// Invariant 2: no generated cost carries a negative constant term.
        #[test]
        fn costs_never_go_negative(step in 1i64..5) {
            let source = format!("begin for i<-1 to n step {} do begin x<-1 end end", step);
            let result = run(&source);
            prop_assert!(no_negative_constant(&result.ir_worst));
            prop_assert!(no_negative_constant(&result.ir_best));
            prop_assert!(no_negative_constant(&result.ir_avg));
        }
    }

    fn no_negative_constant(value: &crate::ir::Ir) -> bool {
        use crate::ir::Ir;
        match value {
            Ir::K { value } => value.numer.signum() * value.denom.signum() >= 0,
            Ir::Sym { .. } => true,
            Ir::Sum { terms } | Ir::Prod { factors: terms } => terms.iter().all(no_negative_constant),
            Ir::Pow { base, .. } => no_negative_constant(base),
            Ir::Log { arg, .. } => no_negative_constant(arg),
            Ir::Max { alts } | Ir::Min { alts } => alts.iter().all(no_negative_constant),
            Ir::Piecewise { cases } => cases.iter().all(|(_, v)| no_negative_constant(v)),
        }
    }
}
