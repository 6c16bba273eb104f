use bytes::BytesMut;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use raop_output::audio::{RaopAudioEncoder, encode_frame};
use raop_output::protocol::raop::RaopEncryptor;
use raop_output::protocol::rtp::RtpAudioHeader;

// 352 pairs for RTP, 4096 for the legacy transport
const FRAME_SIZES: [usize; 2] = [1408, 16384];

fn framing_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("alac_framing");

    for size in FRAME_SIZES {
        let pcm = vec![0xAB; size];
        let mut out = Vec::with_capacity(size + 7);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &pcm, |b, pcm| {
            b.iter(|| {
                out.clear();
                encode_frame(black_box(pcm), &mut out);
            });
        });
    }

    group.finish();
}

fn encryption_benchmark(c: &mut Criterion) {
    let encryptor = RaopEncryptor::default();
    let mut group = c.benchmark_group("aes_frame");

    for size in FRAME_SIZES {
        let mut frame = vec![0x5A; size + 7];
        group.throughput(Throughput::Bytes(frame.len() as u64));
        group.bench_function(BenchmarkId::from_parameter(size), |b| {
            b.iter(|| encryptor.encrypt_in_place(black_box(&mut frame)));
        });
    }

    group.finish();
}

fn packet_benchmark(c: &mut Criterion) {
    let encoder = RaopAudioEncoder::new(Some(RaopEncryptor::default()));
    let pcm = vec![0x11; 1408];
    let mut packet = BytesMut::with_capacity(RtpAudioHeader::SIZE + 1415);

    let mut group = c.benchmark_group("rtp_packet");
    group.throughput(Throughput::Bytes(pcm.len() as u64));
    group.bench_function("encode_encrypt_packetize", |b| {
        let mut sequence = 0u16;
        b.iter(|| {
            let frame = encoder.encode(black_box(&pcm));
            packet.clear();
            RtpAudioHeader {
                marker: false,
                sequence,
                timestamp: 88200,
            }
            .encode_into(&mut packet);
            packet.extend_from_slice(&frame);
            sequence = sequence.wrapping_add(1);
        });
    });
    group.finish();
}

criterion_group!(benches, framing_benchmark, encryption_benchmark, packet_benchmark);
criterion_main!(benches);
