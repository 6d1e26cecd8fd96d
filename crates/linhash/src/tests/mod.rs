mod helpers;

mod split_tests;
