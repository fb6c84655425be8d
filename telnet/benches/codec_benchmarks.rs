//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Throughput benchmarks for the Telnet codec.

use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use retronet_telnet::{consts, TelnetCodec, TelnetFrame, TelnetOption};
use tokio_util::codec::{Decoder, Encoder};

fn bench_decode_plain_data(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_plain_data");
    for size in [128usize, 1024, 8192] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let data: Vec<u8> = (0..size).map(|i| (i % 127) as u8 + 1).collect();
            let mut codec = TelnetCodec::new();
            b.iter(|| {
                let mut src = BytesMut::from(&data[..]);
                while let Some(event) = codec.decode(&mut src).expect("decode ok") {
                    black_box(event);
                }
            });
        });
    }
    group.finish();
}

fn bench_decode_iac_heavy(c: &mut Criterion) {
    c.bench_function("decode_iac_heavy", |b| {
        // Alternating escaped IACs and data.
        let mut data = Vec::with_capacity(2048);
        for _ in 0..512 {
            data.extend_from_slice(&[consts::IAC, consts::IAC, b'x', b'y']);
        }
        let mut codec = TelnetCodec::new();
        b.iter(|| {
            let mut src = BytesMut::from(&data[..]);
            while let Some(event) = codec.decode(&mut src).expect("decode ok") {
                black_box(event);
            }
        });
    });
}

fn bench_encode_frames(c: &mut Criterion) {
    c.bench_function("encode_negotiation_frame", |b| {
        let mut codec = TelnetCodec::new();
        let mut dst = BytesMut::with_capacity(64);
        b.iter(|| {
            dst.clear();
            codec
                .encode(
                    black_box(TelnetFrame::Will(TelnetOption::SuppressGoAhead)),
                    &mut dst,
                )
                .expect("encode ok");
        });
    });

    c.bench_function("encode_data_bytes", |b| {
        let mut codec = TelnetCodec::new();
        let data: Vec<u8> = (0..1024).map(|i| (i % 256) as u8).collect();
        let mut dst = BytesMut::with_capacity(4096);
        b.iter(|| {
            dst.clear();
            codec.encode(black_box(&data[..]), &mut dst).expect("encode ok");
        });
    });
}

criterion_group!(
    benches,
    bench_decode_plain_data,
    bench_decode_iac_heavy,
    bench_encode_frames
);
criterion_main!(benches);
